//! Per-name exceptions to the representation rules.
//!
//! Each table pins the wire and host shape that deployed clients already
//! depend on. They are matched against exact names and are not meant to be
//! extended by analogy.

/// Types that are never polymorphic bases, even when extended or forced.
///
/// `VrpResourceAllocationInfo` was removed in 6.7 and with it the only
/// extension of `ResourceAllocationInfo`.
pub const LEGACY_NON_BASE: &[&str] = &["ResourceAllocationInfo", "FaultDomainId"];

/// Integer fields (`int`, `long`) pointer-wrapped regardless of cardinality.
pub const POINTER_ALWAYS: &[&str] = &["UnitNumber"];

/// Integer fields (`int`, `long`) pointer-wrapped when optional.
pub const POINTER_WHEN_OPTIONAL: &[&str] = &[
    "CoresPerNumaNode",
    "IpPoolId",
    "OwnerId",
    "GroupId",
    "MaxWaitSeconds",
    "Reservation",
    "Limit",
    "OverheadLimit",
    "ResourceReductionToToleratePercent",
];

/// Repeated fields sent even when empty.
pub const KEEP_EMPTY_SEQUENCE: &[&str] = &["AffinitySet"];

/// String fields sent even when empty.
pub const KEEP_EMPTY_STRING: &[&str] = &["IpPoolName"];

/// `anyType` fields sent even when empty.
pub const KEEP_EMPTY_ANY: &[&str] = &["Value", "Val"];

/// (field, host type) pairs whose secondary-protocol tag is suppressed.
pub const SECONDARY_SUPPRESSED: &[(&str, &str)] = &[("This", "ManagedObjectReference")];

/// Attribute added to every value-with-attributes structure.
pub const SYNTHETIC_VALUE_ATTRIBUTE: &str = "serverGuid";

pub(crate) fn listed(table: &[&str], var_name: &str) -> bool {
    table.contains(&var_name)
}
