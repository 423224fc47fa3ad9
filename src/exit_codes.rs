//! Exit code constants for the tokenlock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid state)
//! - 2: Configuration error
//! - 3: Filesystem failure
//! - 4: Lock or pool contention
//! - 5: Protocol misuse (check-in without checkout, guard lock not held)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or unknown resource.
pub const USER_ERROR: i32 = 1;

/// Configuration file could not be read, parsed or validated.
pub const CONFIG_ERROR: i32 = 2;

/// Filesystem failure: permission denied, missing share, disk errors.
pub const IO_FAILURE: i32 = 3;

/// Contention: lock held elsewhere or every pool resource checked out.
pub const LOCK_FAILURE: i32 = 4;

/// Protocol misuse: operation requires state that was never established.
pub const PROTOCOL_ERROR: i32 = 5;
