//! Provider tests that touch the filesystem and process environment

mod precedence;
