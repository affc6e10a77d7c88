/// Parent of every service path. Persistent.
pub const PROVIDER_ROOT_PATH: &str = "/srpc/providers";

pub const PATH_SEPARATOR: char = '/';
