//! Statistical hypothesis testing for differential expression.


pub use welch::{welch_t_test, WelchResult};
