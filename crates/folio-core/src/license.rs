//! License compatibility between a resource and the resources it derives from

use crate::settings::Settings;

/// Can content derived from a parent under `parent_licenses` be published
/// under `child_licenses`?
///
/// Satisfied when at least one parent license permits every child license.
/// A parent with no licenses places no constraint.
pub fn is_license_compatibility_satisfied(
    settings: &Settings,
    parent_licenses: &[&str],
    child_licenses: &[&str],
) -> bool {
    if parent_licenses.is_empty() {
        return true;
    }
    parent_licenses.iter().any(|parent| {
        let compatible = settings.compatible_licenses(parent);
        child_licenses.iter().all(|child| compatible.contains(child))
    })
}
