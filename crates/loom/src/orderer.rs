//! Emission orderer (`spec.md` §4.6, component C6).
//!
//! Produces the final flattened statement sequence: every imported module's
//! items emitted before anything that depends on them, the entry module's
//! own items appended last in their original order and never reordered.
//! File-level cycles (two modules importing each other, directly or
//! transitively) are tolerated rather than rejected — a module on a cycle
//! is emitted at the first point its items are reachable, the same
//! "forward declare, don't deadlock" policy `cribo`'s circular-import
//! handling takes for Python's `if TYPE_CHECKING` cycles.

use indexmap::{IndexMap, IndexSet};
use log::debug;
use rustc_hash::FxHashSet;

use crate::allocator::{Allocation, Item};
use crate::ast::{ItemKind, Stmt};
use crate::module_graph::Module;

pub fn order(modules: &[Module], allocation: &Allocation, rewritten: &IndexMap<String, Vec<Stmt>>) -> Vec<Stmt> {
    let mut items_by_module: IndexMap<String, Vec<&Item>> = IndexMap::new();
    for item in &allocation.items {
        items_by_module.entry(item.module_key.clone()).or_default().push(item);
    }

    let entry_key = modules
        .iter()
        .find(|m| m.is_entry)
        .map(|m| m.key.clone())
        .expect("module graph always has an entry module");

    let mut orderer = Orderer {
        items_by_module,
        rewritten,
        allocation,
        emitted_modules: IndexSet::new(),
        in_progress: IndexSet::new(),
        emitted_items: FxHashSet::default(),
        adding_stack: FxHashSet::default(),
        output: Vec::new(),
    };

    for module in modules.iter().filter(|m| !m.is_entry) {
        orderer.add_module(&module.key);
    }

    if let Some(entry_items) = orderer.items_by_module.get(&entry_key).cloned() {
        for item in entry_items {
            orderer.emit_item(item);
        }
    }

    orderer.output
}

struct Orderer<'a> {
    items_by_module: IndexMap<String, Vec<&'a Item>>,
    rewritten: &'a IndexMap<String, Vec<Stmt>>,
    allocation: &'a Allocation,
    emitted_modules: IndexSet<String>,
    in_progress: IndexSet<String>,
    emitted_items: FxHashSet<String>,
    /// The `adding_stack` of `spec.md` §4.6's `add_item`: items currently
    /// being resolved, so a circular declaration inside one module (two
    /// functions calling each other) stops recursing instead of looping.
    adding_stack: FxHashSet<String>,
    output: Vec<Stmt>,
}

impl<'a> Orderer<'a> {
    fn add_module(&mut self, module_key: &str) {
        if self.emitted_modules.contains(module_key) {
            return;
        }
        if self.in_progress.contains(module_key) {
            debug!("file-level cycle detected at `{module_key}`, deferring");
            return;
        }
        self.in_progress.insert(module_key.to_string());
        let Some(items) = self.items_by_module.get(module_key).cloned() else {
            self.in_progress.shift_remove(module_key);
            return;
        };
        for item in items {
            self.add_item(item);
        }
        self.in_progress.shift_remove(module_key);
        self.emitted_modules.insert(module_key.to_string());
    }

    fn add_item(&mut self, item: &Item) {
        if self.emitted_items.contains(&item.unique_id) {
            return;
        }
        if self.adding_stack.contains(&item.unique_id) {
            debug!("circular declaration at `{}`, relying on order so far", item.unique_id);
            return;
        }
        let Some(rewrite) = self.allocation.module_rewrites.get(&item.module_key) else {
            self.emit_item(item);
            return;
        };
        self.adding_stack.insert(item.unique_id.clone());

        let cross_module_owners: Vec<String> = item
            .deps
            .iter()
            .filter_map(|dep| rewrite.alias_owner.get(dep).cloned())
            .filter(|owner| owner != &item.module_key)
            .collect();
        for owner in cross_module_owners {
            self.add_module(&owner);
        }

        // Same-module dependency: if a sibling item in this module declares a
        // name this item depends on but appears later in the file, bring it
        // forward. Never moves a statement later than its source position,
        // only earlier (`spec.md` §4.6).
        if let Some(siblings) = self.items_by_module.get(&item.module_key).cloned() {
            for dep in &item.deps {
                if rewrite.alias_owner.contains_key(dep) {
                    continue;
                }
                if let Some(sibling) = siblings
                    .iter()
                    .find(|sib| sib.unique_id != item.unique_id && declares(sib, dep))
                {
                    self.add_item(sibling);
                }
            }
        }

        self.adding_stack.remove(&item.unique_id);
        self.emit_item(item);
    }

    fn emit_item(&mut self, item: &Item) {
        if !self.emitted_items.insert(item.unique_id.clone()) {
            return;
        }
        let stmt = self
            .rewritten
            .get(&item.module_key)
            .and_then(|body| body.get(item.stmt_index))
            .expect("every item indexes its module's rewritten body")
            .clone();
        self.output.push(stmt);
    }
}

fn declares(item: &Item, name: &str) -> bool {
    match &item.kind {
        ItemKind::Function(n) => n == name,
        ItemKind::LocalBinding(names) => names.iter().any(|n| n == name),
        _ => false,
    }
}
