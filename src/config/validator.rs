//! Config validation: referential integrity of entity definitions.

use crate::config::EntityConfig;
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};

pub fn validate(entities: &[EntityConfig]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for e in entities {
        if e.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!("entity for table '{}' has an empty name", e.table)));
        }
        if !names.insert(e.name.as_str()) {
            return Err(ConfigError::DuplicateName(e.name.clone()));
        }
    }

    let columns_by_entity: HashMap<&str, HashSet<&str>> = entities
        .iter()
        .map(|e| (e.name.as_str(), e.columns.iter().map(|c| c.name.as_str()).collect()))
        .collect();

    for e in entities {
        let own = &columns_by_entity[e.name.as_str()];
        if !own.contains(e.primary_key.as_str()) {
            return Err(ConfigError::InvalidPrimaryKey {
                entity: e.name.clone(),
                column: e.primary_key.clone(),
            });
        }

        let mut include_names = HashSet::new();
        for inc in &e.includes {
            if !include_names.insert(inc.name.as_str()) {
                return Err(ConfigError::DuplicateName(format!("{}.{}", e.name, inc.name)));
            }
            let Some(theirs) = columns_by_entity.get(inc.entity.as_str()) else {
                return Err(ConfigError::MissingReference {
                    kind: "entity",
                    id: inc.entity.clone(),
                });
            };
            if !own.contains(inc.our_key.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "column",
                    id: format!("{}.{}", e.name, inc.our_key),
                });
            }
            if !theirs.contains(inc.their_key.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "column",
                    id: format!("{}.{}", inc.entity, inc.their_key),
                });
            }
        }

        let mut scope_names = HashSet::new();
        for scope in &e.scopes {
            if !scope_names.insert(scope.name.as_str()) {
                return Err(ConfigError::DuplicateName(format!("{}.{}", e.name, scope.name)));
            }
            if !own.contains(scope.column.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "column",
                    id: format!("{}.{}", e.name, scope.column),
                });
            }
        }
    }

    Ok(())
}
