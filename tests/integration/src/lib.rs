//! Test-only package; see `tests/` for the end-to-end suites.
