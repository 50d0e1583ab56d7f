//! Versioned upgrades of the stored document
//!
//! Documents written by older builds are brought forward by an ordered list
//! of steps, each tagged with the version that introduced it. Every step
//! whose version is newer than the document runs once, then the document is
//! stamped with [`CURRENT_VERSION`]. Documents from a newer major or minor
//! release are refused.

use std::cmp::Ordering;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::storage::CURRENT_VERSION;

/// Version of a document that was never written by a real build
const INITIAL_VERSION: &str = "1.0";

/// Errors raised while migrating a document
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MigrationError {
    /// Document comes from a newer release
    #[error("Data version {found} is newer than {current}, please update")]
    NewerVersion {
        /// Version found in the document
        found: String,
        /// Version of this build
        current: String,
    },

    /// Version string cannot be parsed
    #[error("Invalid data version: {0}")]
    InvalidVersion(String),

    /// Document is not a JSON object
    #[error("Document is not an object")]
    NotAnObject,
}

/// Result of [`migrate`]
#[derive(Debug, Clone, PartialEq)]
pub struct Migrated {
    /// Upgraded document
    pub data: Map<String, Value>,
    /// Top-level keys the upgrade dropped; storage should remove them too
    pub removed_keys: Vec<String>,
    /// Version the document had before
    pub from_version: String,
}

impl Migrated {
    /// Returns true if the document changed
    #[must_use]
    pub fn is_upgraded(&self) -> bool {
        self.from_version != CURRENT_VERSION
    }
}

struct Step {
    version: &'static str,
    remove: &'static [&'static str],
    apply: fn(&mut Map<String, Value>),
}

const STEPS: &[Step] = &[
    Step {
        version: "3.0.9",
        remove: &[],
        apply: default_meta_key,
    },
    Step {
        version: "3.0.10",
        remove: &["browserActionIconColor"],
        apply: flatten_hotkey_actions,
    },
    Step {
        version: "3.4.4",
        remove: &["createThumbnailsForTabs"],
        apply: no_op,
    },
    Step {
        version: "4.0",
        remove: &[
            "useTabsFavIconsFromGoogleS2Converter",
            "doRemoveSTGNewTabUrls",
            "thumbnails",
            "windowsGroup",
            "showGroupCircleInSearchedTab",
            "enableKeyboardShortcutLoadNextPrevGroup",
            "enableKeyboardShortcutLoadByIndexGroup",
            "enableFastGroupSwitching",
            "enableFavIconsForNotLoadedTabs",
            "createNewGroupAfterAttachTabToNewWindow",
            "individualWindowForEachGroup",
            "openNewWindowWhenCreateNewGroup",
            "showNotificationIfGroupsNotSyncedAtStartup",
            "showGroupIconWhenSearchATab",
            "showUrlTooltipOnTabHover",
        ],
        apply: drop_group_windows,
    },
    Step {
        version: "4.1",
        remove: &[],
        apply: reset_new_tab_container,
    },
    Step {
        version: "4.2",
        remove: &["followToLoadedGroupInSideBar"],
        apply: no_op,
    },
    Step {
        version: "4.3.5",
        remove: &[],
        apply: reopen_in_group_container,
    },
];

const fn no_op(_: &mut Map<String, Value>) {}

fn default_meta_key(data: &mut Map<String, Value>) {
    for hotkey in array_items(data, "hotkeys") {
        hotkey.entry("metaKey").or_insert(Value::Bool(false));
    }
}

// Hotkey actions used to be objects carrying the group id
fn flatten_hotkey_actions(data: &mut Map<String, Value>) {
    for hotkey in array_items(data, "hotkeys") {
        if let Some(Value::Object(action)) = hotkey.get("action").cloned() {
            if let Some(group_id) = action.get("groupId") {
                hotkey.insert("groupId".to_string(), group_id.clone());
            }
            let id = action.get("id").cloned().unwrap_or(Value::Null);
            hotkey.insert("action".to_string(), id);
        }
    }
}

fn drop_group_windows(data: &mut Map<String, Value>) {
    for group in array_items(data, "groups") {
        group.remove("windowId");
        group.insert("dontDiscardTabsAfterHideThisGroup".to_string(), Value::Bool(false));
    }
}

fn reset_new_tab_container(data: &mut Map<String, Value>) {
    for group in array_items(data, "groups") {
        group.insert("newTabContainer".to_string(), Value::Null);
    }
}

fn reopen_in_group_container(data: &mut Map<String, Value>) {
    for group in array_items(data, "groups") {
        group.insert("ifNotDefaultContainerReOpenInNew".to_string(), Value::Bool(true));
    }
}

fn array_items<'a>(
    data: &'a mut Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a mut Map<String, Value>> {
    data.get_mut(key)
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
}

fn parse_version(version: &str) -> Result<Vec<u64>, MigrationError> {
    let trimmed = version.trim();
    if trimmed.is_empty() {
        return Err(MigrationError::InvalidVersion(version.to_string()));
    }
    trimmed
        .split('.')
        .map(|part| {
            part.parse::<u64>()
                .map_err(|_| MigrationError::InvalidVersion(version.to_string()))
        })
        .collect()
}

/// Compares dotted version strings, missing parts count as zero
///
/// # Errors
///
/// Returns [`MigrationError::InvalidVersion`] if either side is not a
/// dotted list of numbers.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering, MigrationError> {
    let a = parse_version(a)?;
    let b = parse_version(b)?;
    let len = a.len().max(b.len());
    let part = |v: &[u64], i: usize| v.get(i).copied().unwrap_or(0);
    Ok((0..len)
        .map(|i| part(&a, i).cmp(&part(&b, i)))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal))
}

/// Upgrades a raw document to [`CURRENT_VERSION`]
///
/// A document without a version is treated as freshly created and only
/// stamped.
///
/// # Errors
///
/// Returns [`MigrationError::NewerVersion`] for documents of a newer major
/// or minor release, [`MigrationError::InvalidVersion`] for an unparsable
/// version, and [`MigrationError::NotAnObject`] if `value` is not an object.
pub fn migrate(value: Value) -> Result<Migrated, MigrationError> {
    let Value::Object(mut data) = value else {
        return Err(MigrationError::NotAnObject);
    };

    let from_version = match data.get("version") {
        Some(Value::String(v)) => v.clone(),
        Some(Value::Number(n)) => n.to_string(),
        None | Some(Value::Null) => INITIAL_VERSION.to_string(),
        Some(other) => return Err(MigrationError::InvalidVersion(other.to_string())),
    };

    let mut removed_keys = Vec::new();

    if from_version != INITIAL_VERSION {
        match compare_versions(&from_version, CURRENT_VERSION)? {
            Ordering::Equal => {}
            Ordering::Less => {
                for step in STEPS {
                    if compare_versions(&from_version, step.version)?.is_lt() {
                        tracing::debug!(version = step.version, "Applying migration step");
                        (step.apply)(&mut data);
                        removed_keys.extend(step.remove.iter().map(ToString::to_string));
                    }
                }
            }
            Ordering::Greater => check_not_newer_release(&from_version)?,
        }
    }

    for key in &removed_keys {
        data.remove(key);
    }
    removed_keys.sort();
    removed_keys.dedup();

    data.insert("version".to_string(), Value::String(CURRENT_VERSION.to_string()));
    if from_version != CURRENT_VERSION {
        tracing::info!(from = %from_version, to = CURRENT_VERSION, "Data migrated");
    }

    Ok(Migrated {
        data,
        removed_keys,
        from_version,
    })
}

// Patch releases of the same major.minor stay readable
fn check_not_newer_release(found: &str) -> Result<(), MigrationError> {
    let found_parts = parse_version(found)?;
    let current_parts = parse_version(CURRENT_VERSION)?;
    let major_minor = |v: &[u64]| (v.first().copied().unwrap_or(0), v.get(1).copied().unwrap_or(0));

    if major_minor(&found_parts) > major_minor(&current_parts) {
        return Err(MigrationError::NewerVersion {
            found: found.to_string(),
            current: CURRENT_VERSION.to_string(),
        });
    }
    Ok(())
}
