//! Exception-handling regions of a method body.
//!
//! Each region pairs a protected `try` range with a handler range and, for filter clauses, the
//! offset at which the filter expression starts. The region list is supplied by the caller
//! together with the IL buffer; its order matters, because the first matching `finally` clause
//! is the one the path enumerator inserts.

use bitflags::bitflags;

bitflags! {
    /// Exception handler flags defining the type of exception handling clause.
    ///
    /// `EXCEPTION` has the value zero, so a typed catch clause is a region whose flags are empty.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExceptionHandlerFlags: u16 {
        /// A typed exception clause.
        const EXCEPTION = 0x0000;
        /// An exception filter and handler clause.
        const FILTER = 0x0001;
        /// A finally clause.
        const FINALLY = 0x0002;
        /// A fault clause (finally that executes only on exception).
        const FAULT = 0x0004;
    }
}

/// One try/handler pair of a method body.
///
/// ```text
/// try {
///     // try_offset -> try_offset + try_length
/// }
/// filter {
///     // filter_offset -> handler_offset, FILTER only
/// }
/// catch / finally / fault {
///     // handler_offset -> handler_offset + handler_length
/// }
/// ```
///
/// # Examples
///
/// ```rust
/// use cilflow::metadata::exceptions::ExceptionRegion;
///
/// let region = ExceptionRegion::finally(0x00, 0x10, 0x10, 0x06);
/// assert!(region.is_finally());
/// assert!(region.try_contains(0x0F));
/// assert!(!region.try_contains(0x10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExceptionRegion {
    /// Flags describing the type of exception handler (catch, filter, finally, fault).
    pub flags: ExceptionHandlerFlags,
    /// Offset in bytes of try block from start of method body.
    pub try_offset: u32,
    /// Length in bytes of the try block.
    pub try_length: u32,
    /// Location of the handler for this try block.
    pub handler_offset: u32,
    /// Size of the handler code in bytes.
    pub handler_length: u32,
    /// Start of the filter expression. Only meaningful when `flags` contains `FILTER`.
    pub filter_offset: u32,
}

impl ExceptionRegion {
    /// A typed `catch` clause.
    #[must_use]
    pub const fn catch(
        try_offset: u32,
        try_length: u32,
        handler_offset: u32,
        handler_length: u32,
    ) -> Self {
        ExceptionRegion {
            flags: ExceptionHandlerFlags::EXCEPTION,
            try_offset,
            try_length,
            handler_offset,
            handler_length,
            filter_offset: 0,
        }
    }

    /// A `filter` clause whose filter expression starts at `filter_offset`.
    #[must_use]
    pub const fn filter(
        try_offset: u32,
        try_length: u32,
        filter_offset: u32,
        handler_offset: u32,
        handler_length: u32,
    ) -> Self {
        ExceptionRegion {
            flags: ExceptionHandlerFlags::FILTER,
            try_offset,
            try_length,
            handler_offset,
            handler_length,
            filter_offset,
        }
    }

    /// A `finally` clause.
    #[must_use]
    pub const fn finally(
        try_offset: u32,
        try_length: u32,
        handler_offset: u32,
        handler_length: u32,
    ) -> Self {
        ExceptionRegion {
            flags: ExceptionHandlerFlags::FINALLY,
            try_offset,
            try_length,
            handler_offset,
            handler_length,
            filter_offset: 0,
        }
    }

    /// A `fault` clause.
    #[must_use]
    pub const fn fault(
        try_offset: u32,
        try_length: u32,
        handler_offset: u32,
        handler_length: u32,
    ) -> Self {
        ExceptionRegion {
            flags: ExceptionHandlerFlags::FAULT,
            try_offset,
            try_length,
            handler_offset,
            handler_length,
            filter_offset: 0,
        }
    }

    /// `true` for a typed catch clause
    #[must_use]
    pub fn is_catch(&self) -> bool {
        self.flags.is_empty()
    }

    /// `true` for a filter clause
    #[must_use]
    pub fn is_filter(&self) -> bool {
        self.flags.contains(ExceptionHandlerFlags::FILTER)
    }

    /// `true` for a finally clause
    #[must_use]
    pub fn is_finally(&self) -> bool {
        self.flags.contains(ExceptionHandlerFlags::FINALLY)
    }

    /// `true` for a fault clause
    #[must_use]
    pub fn is_fault(&self) -> bool {
        self.flags.contains(ExceptionHandlerFlags::FAULT)
    }

    /// `true` if a `throw` inside the protected range can be caught by this clause
    #[must_use]
    pub fn handles_exceptions(&self) -> bool {
        self.is_catch() || self.is_filter()
    }

    /// Start of the protected range
    #[must_use]
    pub fn try_start(&self) -> usize {
        self.try_offset as usize
    }

    /// First offset after the protected range
    #[must_use]
    pub fn try_end(&self) -> usize {
        self.try_start().saturating_add(self.try_length as usize)
    }

    /// Start of the handler
    #[must_use]
    pub fn handler_start(&self) -> usize {
        self.handler_offset as usize
    }

    /// First offset after the handler
    #[must_use]
    pub fn handler_end(&self) -> usize {
        self.handler_start()
            .saturating_add(self.handler_length as usize)
    }

    /// Start of the filter expression, for filter clauses
    #[must_use]
    pub fn filter_start(&self) -> Option<usize> {
        self.is_filter().then_some(self.filter_offset as usize)
    }

    /// `true` if `offset` lies in `[try_offset, try_offset + try_length)`
    #[must_use]
    pub fn try_contains(&self, offset: usize) -> bool {
        offset >= self.try_start() && offset < self.try_end()
    }

    /// `true` if `offset` lies in `[handler_offset, handler_offset + handler_length)`
    #[must_use]
    pub fn handler_contains(&self, offset: usize) -> bool {
        offset >= self.handler_start() && offset < self.handler_end()
    }

    /// Short name of the clause kind, as used in listings
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        if self.is_filter() {
            "filter"
        } else if self.is_finally() {
            "finally"
        } else if self.is_fault() {
            "fault"
        } else {
            "catch"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        let catch = ExceptionRegion::catch(0, 4, 4, 2);
        assert!(catch.is_catch());
        assert!(catch.handles_exceptions());
        assert!(!catch.is_finally());
        assert_eq!(catch.filter_start(), None);
        assert_eq!(catch.kind_name(), "catch");

        let filter = ExceptionRegion::filter(0, 4, 4, 8, 2);
        assert!(filter.is_filter());
        assert!(!filter.is_catch());
        assert!(filter.handles_exceptions());
        assert_eq!(filter.filter_start(), Some(4));

        let finally = ExceptionRegion::finally(0, 4, 4, 2);
        assert!(finally.is_finally());
        assert!(!finally.handles_exceptions());
        assert_eq!(finally.kind_name(), "finally");

        let fault = ExceptionRegion::fault(0, 4, 4, 2);
        assert!(fault.is_fault());
        assert!(!fault.handles_exceptions());
    }

    #[test]
    fn ranges() {
        let region = ExceptionRegion::catch(0x02, 0x0A, 0x0C, 0x04);

        assert!(!region.try_contains(0x01));
        assert!(region.try_contains(0x02));
        assert!(region.try_contains(0x0B));
        assert!(!region.try_contains(0x0C));

        assert!(region.handler_contains(0x0C));
        assert!(!region.handler_contains(0x10));
        assert_eq!(region.try_end(), 0x0C);
        assert_eq!(region.handler_end(), 0x10);
    }
}
