/// Page size used when a listing request does not carry one
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size a caller may ask for; bigger requests are clamped
pub const MAX_PAGE_SIZE: u32 = 50;

/// Directory age bounds applied when the caller leaves them out
pub const DEFAULT_MIN_AGE: u32 = 18;
pub const DEFAULT_MAX_AGE: u32 = 100;

/// Response header carrying page metadata as JSON
pub const PAGINATION_HEADER: &str = "Pagination";

/// Request header holding the username resolved by the authenticating gateway
pub const IDENTITY_HEADER: &str = "x-amity-user";

/// Response header echoing the directory filter that was actually applied
pub const MEMBER_FILTER_HEADER: &str = "Member-Filter";
