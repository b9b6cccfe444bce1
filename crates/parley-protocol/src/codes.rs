//! Machine-readable error codes carried on error replies.

/// Unknown room name or unknown service name.
pub const NOT_FOUND: &str = "not_found";

/// Operation referenced a user who is not in the named room.
pub const NOT_MEMBER: &str = "not_member";

/// The daemon's state owner has shut down.
pub const UNAVAILABLE: &str = "unavailable";

/// Malformed frame, unparsable request, or unsupported protocol version.
pub const BAD_REQUEST: &str = "bad_request";
