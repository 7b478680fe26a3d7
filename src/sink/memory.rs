//! In-process capture of everything a pipeline emits.

use crate::error::Result;
use crate::operator::Operator;
use crate::record::Record;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Record(Record),
    Flush(Record),
}

/// Read side of a [`MemorySink`]; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemoryHandle {
    events: Rc<RefCell<Vec<SinkEvent>>>,
}

impl MemoryHandle {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.borrow().clone()
    }

    pub fn records(&self) -> Vec<Record> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Record(r) => Some(r.clone()),
                SinkEvent::Flush(_) => None,
            })
            .collect()
    }

    pub fn flushes(&self) -> Vec<Record> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Flush(r) => Some(r.clone()),
                SinkEvent::Record(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

/// Terminal operator recording accepted records and flush contexts in order.
#[derive(Debug)]
pub struct MemorySink {
    events: Rc<RefCell<Vec<SinkEvent>>>,
}

impl MemorySink {
    pub fn new() -> (Self, MemoryHandle) {
        let handle = MemoryHandle::default();
        let sink = Self {
            events: Rc::clone(&handle.events),
        };
        (sink, handle)
    }
}

impl Operator for MemorySink {
    fn accept(&mut self, record: &Record) -> Result<()> {
        self.events.borrow_mut().push(SinkEvent::Record(record.clone()));
        Ok(())
    }

    fn flush(&mut self, ctx: &Record) -> Result<()> {
        self.events.borrow_mut().push(SinkEvent::Flush(ctx.clone()));
        Ok(())
    }
}
