//! Typed diagnostic payloads attached to a fault event.
//!
//! Each variant borrows from the producer's stack frame. The reporter never
//! interprets a payload; it only forwards the `Display` dump to the sink.

use core::fmt;
use core::mem::size_of;

/// Details of a failed application assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssertContext<'a> {
    /// Source file.
    pub file: &'a str,
    /// Source line.
    pub line: u32,
    /// Enclosing function.
    pub function: &'a str,
    /// Asserted expression.
    pub condition: &'a str,
    /// Free-form message.
    pub message: &'a str,
}

/// Details of a frame that failed its CRC check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrcContext<'a> {
    /// Link or protocol name.
    pub protocol: &'a str,
    /// CRC computed over the payload.
    pub expected: u32,
    /// CRC carried by the frame.
    pub received: u32,
    /// Frame sequence number.
    pub packet_id: u32,
    /// Frame length in bytes.
    pub size: u32,
}

/// Details of a peripheral deadline miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutContext<'a> {
    /// Device name.
    pub peripheral: &'a str,
    /// Operation that did not complete.
    pub operation: &'a str,
    /// Configured deadline.
    pub timeout_ms: u32,
    /// Time actually waited.
    pub elapsed_ms: u32,
}

/// Details of a supply brownout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrownoutContext<'a> {
    /// Supply rail name.
    pub rail: &'a str,
    /// Measured voltage.
    pub voltage_mv: u32,
    /// Brownout threshold.
    pub threshold_mv: u32,
}

/// Details of a memory integrity failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryContext<'a> {
    /// Region name (stack, heap, section).
    pub region: &'a str,
    /// Faulting address.
    pub address: u64,
    /// Expected canary or checksum.
    pub expected: u32,
    /// Observed value.
    pub actual: u32,
}

/// Diagnostic payload, one variant per payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultContext<'a> {
    /// No payload.
    #[default]
    None,
    /// Application assertion.
    Assert(AssertContext<'a>),
    /// CRC mismatch.
    Crc(CrcContext<'a>),
    /// Peripheral timeout.
    Timeout(TimeoutContext<'a>),
    /// Power brownout.
    Brownout(BrownoutContext<'a>),
    /// Memory integrity.
    Memory(MemoryContext<'a>),
    /// Opaque producer-defined bytes.
    Raw(&'a [u8]),
}

impl<'a> FaultContext<'a> {
    /// Size in bytes of the payload this context describes.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Assert(_) => size_of::<AssertContext<'_>>(),
            Self::Crc(_) => size_of::<CrcContext<'_>>(),
            Self::Timeout(_) => size_of::<TimeoutContext<'_>>(),
            Self::Brownout(_) => size_of::<BrownoutContext<'_>>(),
            Self::Memory(_) => size_of::<MemoryContext<'_>>(),
            Self::Raw(bytes) => bytes.len(),
        }
    }

    /// True when there is no payload.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Short name of the payload shape.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Assert(_) => "assert",
            Self::Crc(_) => "crc",
            Self::Timeout(_) => "timeout",
            Self::Brownout(_) => "brownout",
            Self::Memory(_) => "memory",
            Self::Raw(_) => "raw",
        }
    }

    /// Assertion payload, if that is the shape.
    #[must_use]
    pub const fn as_assert(&self) -> Option<&AssertContext<'a>> {
        match self {
            Self::Assert(ctx) => Some(ctx),
            _ => None,
        }
    }

    /// CRC payload, if that is the shape.
    #[must_use]
    pub const fn as_crc(&self) -> Option<&CrcContext<'a>> {
        match self {
            Self::Crc(ctx) => Some(ctx),
            _ => None,
        }
    }

    /// Timeout payload, if that is the shape.
    #[must_use]
    pub const fn as_timeout(&self) -> Option<&TimeoutContext<'a>> {
        match self {
            Self::Timeout(ctx) => Some(ctx),
            _ => None,
        }
    }

    /// Brownout payload, if that is the shape.
    #[must_use]
    pub const fn as_brownout(&self) -> Option<&BrownoutContext<'a>> {
        match self {
            Self::Brownout(ctx) => Some(ctx),
            _ => None,
        }
    }

    /// Memory payload, if that is the shape.
    #[must_use]
    pub const fn as_memory(&self) -> Option<&MemoryContext<'a>> {
        match self {
            Self::Memory(ctx) => Some(ctx),
            _ => None,
        }
    }

    /// Raw bytes, if that is the shape.
    #[must_use]
    pub const fn as_raw(&self) -> Option<&'a [u8]> {
        match self {
            Self::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }
}

impl<'a> From<AssertContext<'a>> for FaultContext<'a> {
    fn from(ctx: AssertContext<'a>) -> Self {
        Self::Assert(ctx)
    }
}

impl<'a> From<CrcContext<'a>> for FaultContext<'a> {
    fn from(ctx: CrcContext<'a>) -> Self {
        Self::Crc(ctx)
    }
}

impl<'a> From<TimeoutContext<'a>> for FaultContext<'a> {
    fn from(ctx: TimeoutContext<'a>) -> Self {
        Self::Timeout(ctx)
    }
}

impl<'a> From<BrownoutContext<'a>> for FaultContext<'a> {
    fn from(ctx: BrownoutContext<'a>) -> Self {
        Self::Brownout(ctx)
    }
}

impl<'a> From<MemoryContext<'a>> for FaultContext<'a> {
    fn from(ctx: MemoryContext<'a>) -> Self {
        Self::Memory(ctx)
    }
}

impl<'a> From<&'a [u8]> for FaultContext<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Raw(bytes)
    }
}

impl fmt::Display for FaultContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("-"),
            Self::Assert(c) => write!(
                f,
                "file={} line={} function={} condition=\"{}\" message=\"{}\"",
                c.file, c.line, c.function, c.condition, c.message
            ),
            Self::Crc(c) => write!(
                f,
                "protocol={} expected={:#010x} received={:#010x} packet_id={} size={}",
                c.protocol, c.expected, c.received, c.packet_id, c.size
            ),
            Self::Timeout(c) => write!(
                f,
                "peripheral={} operation={} timeout_ms={} elapsed_ms={}",
                c.peripheral, c.operation, c.timeout_ms, c.elapsed_ms
            ),
            Self::Brownout(c) => write!(
                f,
                "rail={} voltage_mv={} threshold_mv={}",
                c.rail, c.voltage_mv, c.threshold_mv
            ),
            Self::Memory(c) => write!(
                f,
                "region={} address={:#x} expected={:#010x} actual={:#010x}",
                c.region, c.address, c.expected, c.actual
            ),
            Self::Raw(bytes) => {
                f.write_str("raw=")?;
                for byte in *bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_context_size() {
        assert_eq!(FaultContext::None.size(), 0);
        assert_eq!(FaultContext::Raw(&[1, 2, 3]).size(), 3);
        let crc = FaultContext::from(CrcContext {
            protocol: "uart",
            expected: 1,
            received: 2,
            packet_id: 3,
            size: 64,
        });
        assert_eq!(crc.size(), size_of::<CrcContext<'_>>());
    }

    #[test]
    fn test_context_accessors() {
        let ctx = FaultContext::from(BrownoutContext {
            rail: "VDD_CORE",
            voltage_mv: 2900,
            threshold_mv: 3000,
        });
        assert_eq!(ctx.shape(), "brownout");
        assert!(ctx.as_brownout().is_some());
        assert!(ctx.as_assert().is_none());
        assert!(ctx.as_raw().is_none());
    }

    #[test]
    fn test_context_display_dumps_fields() {
        let ctx = FaultContext::from(AssertContext {
            file: "main.c",
            line: 42,
            function: "sensor_read",
            condition: "len > 0",
            message: "empty frame",
        });
        let dump = ctx.to_string();
        assert!(dump.contains("file=main.c"));
        assert!(dump.contains("line=42"));
        assert!(dump.contains("condition=\"len > 0\""));

        let crc = FaultContext::from(CrcContext {
            protocol: "spi",
            expected: 0xDEAD_BEEF,
            received: 0x0000_BEEF,
            packet_id: 7,
            size: 16,
        });
        assert!(crc.to_string().contains("expected=0xdeadbeef"));

        assert_eq!(FaultContext::Raw(&[0xAB, 0x01]).to_string(), "raw=ab01");
        assert_eq!(FaultContext::None.to_string(), "-");
    }
}
