//! Row status codes shared across the pipeline tables.
//!
//! Every queue table carries a `processing_status` state machine
//! (pending -> in progress -> done); rows only ever move forward, or
//! back to pending when a batch rolls back.

/// `processing_status` values.
pub mod processing {
    pub const PENDING: i16 = 0;
    pub const IN_PROGRESS: i16 = 1;
    pub const DONE: i16 = 2;
}

/// `active_status` values.
pub mod active {
    pub const INACTIVE: i16 = 0;
    pub const ACTIVE: i16 = 1;
}

/// `security_analysis_status` values produced by the static analyzer.
///
/// Only `LOW_RISK` and `CLEAN` sources continue to the LLM stage.
pub mod security {
    pub const NOT_ANALYZED: i16 = 0;
    /// The analyzer could not compile the source.
    pub const COMPILE_FAILED: i16 = 1;
    pub const MEDIUM_RISK: i16 = 2;
    pub const HIGH_RISK: i16 = 3;
    pub const LOW_RISK: i16 = 4;
    pub const CLEAN: i16 = 5;
}

/// `token_analysis_status` values on eligibility rows.
///
/// 0 means the token source has not been audited yet; 1-3 deactivate the
/// row; 4 and 5 are reported to users as "Caution" / "Verified Safe".
pub mod token {
    pub const NOT_ANALYZED: i16 = 0;
    pub const COMPILE_FAILED: i16 = 1;
    pub const UNSAFE: i16 = 2;
    pub const SUSPICIOUS: i16 = 3;
    pub const CAUTION: i16 = 4;
    pub const VERIFIED_SAFE: i16 = 5;
}

/// `source_code_verified_status` values on `evm_contract`.
pub mod verified {
    pub const UNVERIFIED: i16 = 0;
    pub const VERIFIED: i16 = 1;
}
