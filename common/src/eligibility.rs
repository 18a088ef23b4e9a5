//! Femoral access-site eligibility

/// Access-site codes that count as a femoral puncture:
/// 1 retrograde, 2 antegrade, 3 SFA, 11 retro→antegrade, 12 ante→retrograde, 13 femoral
pub const FEMORAL_ACCESS_CODES: &[&str] = &["1", "2", "3", "11", "12", "13"];

/// Eligible iff either access-site code is in the femoral allow-set.
pub fn has_femoral_access(access_site_1: &str, access_site_2: &str) -> bool {
    [access_site_1, access_site_2]
        .iter()
        .any(|code| FEMORAL_ACCESS_CODES.contains(&code.trim()))
}
