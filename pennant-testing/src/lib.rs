//! Testing utilities for Pennant
//!
//! - [`MockAdapter`] - a scriptable flag source that records every call
//! - [`ExposureRecorder`] - captures exposures reported by a client
//!
//! ```
//! use pennant_core::{FlagClient, FlagValue};
//! use pennant_testing::{ExposureRecorder, MockAdapter};
//!
//! # tokio_test::block_on(async {
//! let adapter = MockAdapter::new().with_value("theme", "dark");
//! let recorder = ExposureRecorder::new();
//! let client = FlagClient::builder(adapter.clone())
//!     .on_exposure(recorder.callback())
//!     .build();
//!
//! client.initialize().await.unwrap();
//! let theme = client.evaluate("theme", None, None).await.unwrap();
//!
//! assert_eq!(theme, FlagValue::string("dark"));
//! assert_eq!(adapter.evaluation_count("theme"), 1);
//! assert_eq!(recorder.values("theme"), vec![theme]);
//! # });
//! ```

pub mod mock;
pub mod recorder;

pub use mock::{EvaluationCall, MockAdapter};
pub use recorder::ExposureRecorder;
