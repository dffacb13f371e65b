#![allow(unused_imports)]

pub use crate::error::{BoxError, Error, Result};
pub use crate::{input_bail, record_bail};
pub use async_trait::async_trait;
pub use bytes::Bytes;
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use std::sync::{Arc, Mutex};
pub use std::time::Duration;

pub use tracing::{debug, error, info, instrument, trace, warn};
