//! Helper macros for the link modules.

/// Generate debug formatting code for a [`SerialPort`](serialport::SerialPort)
/// like struct, followed by the link's receive timeout.
#[macro_export]
macro_rules! debug_fmt_serialport {
    ($port:expr, $timeout:expr, $f:ident) => {
        $f.debug_tuple("PortLink")
            .field(&$port.name())
            .field(&$port.baud_rate())
            .field(&$port.data_bits())
            .field(&$port.stop_bits())
            .field(&$port.parity())
            .field(&$port.flow_control())
            .field(&$timeout)
    };
}
