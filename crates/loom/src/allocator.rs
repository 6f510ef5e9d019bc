//! Name allocator & rename planner (`spec.md` §4.4, component C4).
//!
//! Assigns every top-level binding in the bundle a globally unique
//! identifier and builds the per-module rewrite tables [`crate::rewriter`]
//! applies. This is the component with the most cross-cutting state in the
//! pipeline, so — like `cribo`'s `semantic_bundler` — it owns its own
//! process-scoped tables and hands the rest of the pipeline an immutable
//! plan rather than exposing them as ambient state.

use indexmap::IndexMap;
use log::{debug, warn};
use rustc_hash::FxHashSet;

use crate::ast::ItemKind;
use crate::error::BundleError;
use crate::identifier_extractor::extract_deps;
use crate::module_graph::Module;

/// A bounded guard on the conflict-cascade rename loop (`spec.md` §9).
const MAX_CASCADE_ROUNDS: usize = 64;

/// One top-level statement, classified and annotated with everything the
/// rewriter (C5) and orderer (C6) need (`spec.md` §3, "Item").
#[derive(Debug, Clone)]
pub struct Item {
    pub module_key: String,
    pub file_seq: usize,
    pub stmt_seq_in_file: usize,
    /// Index into `module.ast_body` for the module this item belongs to.
    pub stmt_index: usize,
    pub kind: ItemKind,
    pub deps: FxHashSet<String>,
    pub unique_id: String,
}

/// Per-module rewrite tables (`spec.md` §3: `alias_map`, `alias_set`,
/// `local_rewrite_map`).
#[derive(Debug, Clone, Default)]
pub struct ModuleRewrite {
    pub alias_map: IndexMap<String, String>,
    pub alias_set: FxHashSet<String>,
    /// Original name -> final unique name, for every simple top-level
    /// binding this module declares (exported or not).
    pub local_rewrite_map: IndexMap<String, String>,
    /// Alias -> the module key that export came from, so the emission
    /// orderer (C6) can build a file-level dependency graph without
    /// re-resolving specifiers.
    pub alias_owner: IndexMap<String, String>,
}

/// The complete output of the allocator: enough to drive both the rewriter
/// and the emission orderer.
#[derive(Debug)]
pub struct Allocation {
    pub exported_unique: IndexMap<String, IndexMap<String, String>>,
    pub global_rename: IndexMap<String, String>,
    pub module_rewrites: IndexMap<String, ModuleRewrite>,
    pub items: Vec<Item>,
}

pub fn allocate(modules: &[Module]) -> Result<Allocation, BundleError> {
    let mut used_names: FxHashSet<String> = FxHashSet::default();
    let mut exported_unique: IndexMap<String, IndexMap<String, String>> = IndexMap::new();
    let mut global_rename: IndexMap<String, String> = IndexMap::new();

    // Rule 1: imported modules first, in discovery order, entry last.
    for module in modules.iter().filter(|m| !m.is_entry) {
        claim_exports(module, &mut used_names, &mut exported_unique);
    }
    // Rule 2 (first half): entry module's own exports.
    if let Some(entry) = modules.iter().find(|m| m.is_entry) {
        claim_exports(entry, &mut used_names, &mut exported_unique);
    }

    // Alias binding: every module's imports can now be resolved, since every
    // module's exports have already been claimed.
    let mut module_rewrites: IndexMap<String, ModuleRewrite> = IndexMap::new();
    for module in modules {
        let mut rewrite = ModuleRewrite::default();
        for (import, target_key) in module.imports.iter().zip(&module.resolved_imports) {
            let Some(target_exports) = exported_unique.get(target_key) else {
                continue;
            };
            for binding in &import.bindings {
                if let Some(unique) = target_exports.get(&binding.name) {
                    rewrite
                        .alias_map
                        .insert(binding.alias.clone(), unique.clone());
                    rewrite.alias_set.insert(binding.alias.clone());
                    rewrite
                        .alias_owner
                        .insert(binding.alias.clone(), target_key.clone());
                }
            }
        }
        module_rewrites.insert(module.key.clone(), rewrite);
    }

    // Rule 2 (second half) + rule 3: walk every module's items in file_seq
    // order (entry last, consistent with the emission orderer's grouping),
    // claiming unique names for non-exported top-level bindings, and
    // collecting the conflict-cascade candidate set as we go.
    let mut items = Vec::new();
    let mut exports_needing_rename: Vec<(String, String)> = Vec::new();

    let ordered_modules: Vec<&Module> = modules
        .iter()
        .filter(|m| !m.is_entry)
        .chain(modules.iter().filter(|m| m.is_entry))
        .collect();

    for module in &ordered_modules {
        for (idx, stmt) in module.ast_body.iter().enumerate() {
            let kind = stmt.classify();
            let deps = extract_deps(stmt);

            match &kind {
                ItemKind::Function(name) => {
                    claim_local(
                        module,
                        name,
                        &mut used_names,
                        &mut global_rename,
                        module_rewrites.get_mut(&module.key).expect("module registered"),
                        &exported_unique,
                    );
                }
                ItemKind::LocalBinding(names) => {
                    for name in names {
                        claim_local(
                            module,
                            name,
                            &mut used_names,
                            &mut global_rename,
                            module_rewrites.get_mut(&module.key).expect("module registered"),
                            &exported_unique,
                        );
                    }
                }
                ItemKind::Method(_) | ItemKind::MemberAssignment(_) | ItemKind::Statement => {}
            }

            // Conflict cascade: does this item read a name that is some
            // *other* module's already-claimed export, without this module
            // legitimately importing it?
            let rewrite = &module_rewrites[&module.key];
            for dep in &deps {
                if let Some((owner, original)) =
                    find_export_owner(&exported_unique, dep, &module.key)
                    && !rewrite.alias_map.values().any(|v| v == dep)
                {
                    exports_needing_rename.push((owner, original));
                }
            }

            items.push(Item {
                module_key: module.key.clone(),
                file_seq: module.file_seq,
                stmt_seq_in_file: idx + 1,
                stmt_index: idx,
                kind,
                deps,
                unique_id: format!("{}#{}", module.key, idx + 1),
            });
        }
    }

    // Process the conflict-cascade rename set.
    exports_needing_rename.sort();
    exports_needing_rename.dedup();
    for (owner, original) in exports_needing_rename {
        rename_export(
            &owner,
            &original,
            &mut used_names,
            &mut exported_unique,
            &mut module_rewrites,
            &items,
        )?;
    }

    Ok(Allocation {
        exported_unique,
        global_rename,
        module_rewrites,
        items,
    })
}

fn claim_exports(
    module: &Module,
    used_names: &mut FxHashSet<String>,
    exported_unique: &mut IndexMap<String, IndexMap<String, String>>,
) {
    let mut claimed = IndexMap::new();
    for export in &module.exports {
        for name in &export.names {
            let unique = claim_name(used_names, name);
            debug!(
                "module `{}` export `{name}` -> `{unique}`",
                module.key
            );
            claimed.insert(name.clone(), unique);
        }
    }
    exported_unique.insert(module.key.clone(), claimed);
}

#[allow(clippy::too_many_arguments)]
fn claim_local(
    module: &Module,
    name: &str,
    used_names: &mut FxHashSet<String>,
    global_rename: &mut IndexMap<String, String>,
    rewrite: &mut ModuleRewrite,
    exported_unique: &IndexMap<String, IndexMap<String, String>>,
) {
    if rewrite.local_rewrite_map.contains_key(name) {
        return;
    }
    let is_export = module.exports.iter().any(|e| e.names.contains(&name.to_string()));
    let unique = if is_export {
        exported_unique
            .get(&module.key)
            .and_then(|m| m.get(name))
            .cloned()
            .unwrap_or_else(|| claim_name(used_names, name))
    } else {
        let unique = claim_name(used_names, name);
        if unique != name {
            global_rename.insert(name.to_string(), unique.clone());
        }
        unique
    };
    rewrite.local_rewrite_map.insert(name.to_string(), unique);
}

fn claim_name(used_names: &mut FxHashSet<String>, base: &str) -> String {
    if used_names.insert(base.to_string()) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}{n}");
        if used_names.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn find_export_owner(
    exported_unique: &IndexMap<String, IndexMap<String, String>>,
    unique_name: &str,
    current_module: &str,
) -> Option<(String, String)> {
    for (owner, exports) in exported_unique {
        if owner == current_module {
            continue;
        }
        for (original, unique) in exports {
            if unique == unique_name {
                return Some((owner.clone(), original.clone()));
            }
        }
    }
    None
}

fn rename_export(
    owner: &str,
    original: &str,
    used_names: &mut FxHashSet<String>,
    exported_unique: &mut IndexMap<String, IndexMap<String, String>>,
    module_rewrites: &mut IndexMap<String, ModuleRewrite>,
    items: &[Item],
) -> Result<(), BundleError> {
    let old_unique = exported_unique[owner][original].clone();

    for round in 0..MAX_CASCADE_ROUNDS {
        let candidate = claim_name(used_names, original);
        let collides = items.iter().any(|item| {
            item.module_key != *owner
                && item.deps.contains(&candidate)
                && !module_rewrites[&item.module_key]
                    .alias_map
                    .values()
                    .any(|v| v == &candidate)
        });
        if !collides {
            debug!(
                "rename export `{owner}::{original}`: `{old_unique}` -> `{candidate}` (round {round})"
            );
            exported_unique
                .get_mut(owner)
                .expect("owner module registered")
                .insert(original.to_string(), candidate.clone());
            if let Some(owner_rewrite) = module_rewrites.get_mut(owner) {
                owner_rewrite
                    .local_rewrite_map
                    .insert(original.to_string(), candidate.clone());
            }
            for rewrite in module_rewrites.values_mut() {
                for value in rewrite.alias_map.values_mut() {
                    if *value == old_unique {
                        *value = candidate.clone();
                    }
                }
            }
            return Ok(());
        }
        warn!("rename candidate `{candidate}` for `{original}` still collides, retrying");
    }

    Err(BundleError::NameExhaustion {
        name: original.to_string(),
    })
}
