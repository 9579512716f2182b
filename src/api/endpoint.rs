pub type Endpoint = str;

/// The local API serves everything from the root path; the operation is chosen by `optType`.
pub const ROOT: &Endpoint = "/";

pub const OPT_TYPE: &str = "optType";
pub const PASSWORD: &str = "pwd";

pub const READ_REAL_TIME_DATA: &str = "ReadRealTimeData";

/// Request body for `opt_type`, in the `key=value&key=value` form the firmware expects.
pub fn request_body(opt_type: &str, password: &str) -> String {
    format!("{}={}&{}={}", OPT_TYPE, opt_type, PASSWORD, password)
}
