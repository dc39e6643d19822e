//! Exit-code catalog of the storage CLI under test
//!
//! These values are a contract owned by the CLI; the harness only compares
//! against them.

/// Success
pub const EX_OK: i32 = 0;
/// Unspecified failure
pub const EX_GENERAL: i32 = 1;
/// Some items of a batch failed
pub const EX_PARTIAL: i32 = 2;
/// Bucket lives on another endpoint
pub const EX_SERVERMOVED: i32 = 10;
/// Endpoint reported an internal error
pub const EX_SERVERERROR: i32 = 11;
/// Bucket or object does not exist
pub const EX_NOTFOUND: i32 = 12;
/// Resource already exists or is not empty
pub const EX_CONFLICT: i32 = 13;
/// Precondition failed
pub const EX_PRECONDITION: i32 = 14;
/// Service unavailable
pub const EX_SERVICE: i32 = 15;
/// Bad command-line usage
pub const EX_USAGE: i32 = 64;
/// Malformed input data
pub const EX_DATAERR: i32 = 65;
/// Internal software error
pub const EX_SOFTWARE: i32 = 70;
/// Operating system error
pub const EX_OSERR: i32 = 71;
/// Missing or unreadable system file
pub const EX_OSFILE: i32 = 72;
/// Input/output error
pub const EX_IOERR: i32 = 74;
/// Temporary failure
pub const EX_TEMPFAIL: i32 = 75;
/// Access denied
pub const EX_ACCESSDENIED: i32 = 77;
/// Configuration error
pub const EX_CONFIG: i32 = 78;
/// Endpoint refused the connection
pub const EX_CONNECTIONREFUSED: i32 = 111;

/// Symbolic name for an exit code, for diagnostics
pub fn name(code: i32) -> Option<&'static str> {
    let name = match code {
        EX_OK => "EX_OK",
        EX_GENERAL => "EX_GENERAL",
        EX_PARTIAL => "EX_PARTIAL",
        EX_SERVERMOVED => "EX_SERVERMOVED",
        EX_SERVERERROR => "EX_SERVERERROR",
        EX_NOTFOUND => "EX_NOTFOUND",
        EX_CONFLICT => "EX_CONFLICT",
        EX_PRECONDITION => "EX_PRECONDITION",
        EX_SERVICE => "EX_SERVICE",
        EX_USAGE => "EX_USAGE",
        EX_DATAERR => "EX_DATAERR",
        EX_SOFTWARE => "EX_SOFTWARE",
        EX_OSERR => "EX_OSERR",
        EX_OSFILE => "EX_OSFILE",
        EX_IOERR => "EX_IOERR",
        EX_TEMPFAIL => "EX_TEMPFAIL",
        EX_ACCESSDENIED => "EX_ACCESSDENIED",
        EX_CONFIG => "EX_CONFIG",
        EX_CONNECTIONREFUSED => "EX_CONNECTIONREFUSED",
        _ => return None,
    };
    Some(name)
}
