//! Runnable examples for `refresher`, see the `examples/` directory.
