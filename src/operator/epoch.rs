//! Tumbling epochs over a float time field.

use super::{reject, BoxedOperator, Operator};
use crate::error::{Result, StreamError};
use crate::record::{Record, Value};
use tracing::trace;

/// Stamps each record with the id of its fixed-width time bucket and emits a
/// flush downstream every time a bucket boundary is crossed.
///
/// The first record only anchors the window at `t + width`. A record whose
/// time equals the boundary closes the bucket before it is stamped.
pub struct Epoch {
    width: f64,
    time_field: String,
    out_field: String,
    boundary: Option<f64>,
    eid: i64,
    next: BoxedOperator,
}

impl Epoch {
    pub fn new(
        width: f64,
        time_field: impl Into<String>,
        out_field: impl Into<String>,
        next: BoxedOperator,
    ) -> Result<Self> {
        if !(width.is_finite() && width > 0.0) {
            return Err(StreamError::InvariantViolation(format!(
                "epoch width must be positive and finite, got {}",
                width
            )));
        }
        Ok(Self {
            width,
            time_field: time_field.into(),
            out_field: out_field.into(),
            boundary: None,
            eid: 0,
            next,
        })
    }

    /// Id that the next accepted record will be stamped with, absent a boundary crossing.
    pub fn current_epoch(&self) -> i64 {
        self.eid
    }

    fn marker(&self) -> Record {
        Record::singleton(self.out_field.clone(), Value::Int(self.eid))
    }

    fn unusable_time(&self, found: &'static str) -> StreamError {
        StreamError::TypeMismatch {
            field: self.time_field.clone(),
            expected: "finite float",
            found,
        }
    }
}

impl Operator for Epoch {
    fn accept(&mut self, record: &Record) -> Result<()> {
        let t = match record.float(&self.time_field) {
            Ok(t) if t.is_finite() => t,
            Ok(_) => return reject("epoch", self.unusable_time("non-finite float")),
            Err(e) => return reject("epoch", e),
        };
        match self.boundary {
            None => self.boundary = Some(t + self.width),
            Some(mut boundary) => {
                while t >= boundary {
                    let next = boundary + self.width;
                    if next <= boundary {
                        return reject("epoch", self.unusable_time("float past epoch precision"));
                    }
                    let marker = self.marker();
                    self.next.flush(&marker)?;
                    boundary = next;
                    self.eid += 1;
                    self.boundary = Some(boundary);
                    trace!(eid = self.eid, boundary, "epoch advanced");
                }
            }
        }
        self.next
            .accept(&record.with(self.out_field.clone(), Value::Int(self.eid)))
    }

    fn flush(&mut self, _ctx: &Record) -> Result<()> {
        let marker = self.marker();
        self.boundary = None;
        self.eid = 0;
        self.next.flush(&marker)
    }
}
