#![allow(
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

#[path = "../../benches/test_functions.rs"]
#[allow(dead_code)]
mod test_functions;

mod builder;
mod local_search;
mod mocks;
mod optimize;
mod random_search;
mod select;
