//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                          |
//! |------|--------------------------------------------------|
//! | 0    | Success                                          |
//! | 1    | General error (unspecified)                      |
//! | 2    | CLI usage error (bad args, missing file)         |
//! | 3    | Workbook could not be opened or read             |
//! | 4    | Store failure; the import was rolled back        |
//! | 5    | Settings file could not be read or parsed        |
//! | 6    | Export or report files could not be written      |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing input file.
pub const EXIT_USAGE: u8 = 2;

/// Workbook unreadable (corrupt, unsupported format, no sheets).
pub const EXIT_WORKBOOK: u8 = 3;

/// Store open/read/write failure. Nothing from the run was committed.
pub const EXIT_STORE: u8 = 4;

/// Settings file malformed or unreadable.
pub const EXIT_CONFIG: u8 = 5;

/// Seller export, manifest, or xlsx report could not be written.
pub const EXIT_EXPORT: u8 = 6;
