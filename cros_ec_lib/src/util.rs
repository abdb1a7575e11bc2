//! Miscellaneous utility functions to use across modules

/// Convert any type to a u8 slice (Like a C byte buffer)
///
/// # Safety
/// `T` must be plain old data without padding, e.g. a `#[repr(C, packed)]` struct.
pub unsafe fn any_as_u8_slice<T: Sized>(p: &T) -> &[u8] {
    let len = ::std::mem::size_of::<T>();
    ::std::slice::from_raw_parts((p as *const T) as *const u8, len)
}

/// Convert an array/slice of any type to a u8 slice (Like a C byte buffer)
///
/// # Safety
/// Same requirements as [`any_as_u8_slice`].
pub unsafe fn any_vec_as_u8_slice<T: Sized>(p: &[T]) -> &[u8] {
    let len = ::std::mem::size_of::<T>() * p.len();
    ::std::slice::from_raw_parts((p.as_ptr() as *const T) as *const u8, len)
}

/// Read a plain old data struct from the start of a byte buffer.
///
/// Returns `None` if the buffer is too short.
pub fn read_struct<T: Copy>(bytes: &[u8]) -> Option<T> {
    if bytes.len() < std::mem::size_of::<T>() {
        return None;
    }
    // Length checked above, read_unaligned has no alignment requirement
    Some(unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const T) })
}

/// Round `value` up to the next multiple of `align` (power of two)
pub const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Turn a NULL padded byte array into a string
pub fn null_terminated_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).to_string()
}

/// Format a byte buffer as a series of hex bytes
pub fn format_buffer(buffer: &[u8]) -> String {
    let mut out = String::with_capacity(buffer.len() * 5);
    for byte in buffer {
        out.push_str(&format!("{:#04X} ", byte));
    }
    out
}

/// Log a buffer 16 bytes per line, prefixed with the address of the first byte
///
/// Example:
///
/// ```text
/// 00000000: 3A 04 00 00 0A 16 00 00  00 00 00 00 00 00 00 00  :...............
/// ```
pub fn trace_multiline_buffer(buffer: &[u8], offset: usize) {
    let chunk_size = 16;
    for (i, chunk) in buffer.chunks(chunk_size).enumerate() {
        let mut line = format!("{:08X}:", offset + i * chunk_size);
        for (j, byte) in chunk.iter().enumerate() {
            if j == 8 {
                line.push(' ');
            }
            line.push_str(&format!(" {:02X}", byte));
        }
        // Pad short last line so the ASCII column lines up
        for j in chunk.len()..chunk_size {
            if j == 8 {
                line.push(' ');
            }
            line.push_str("   ");
        }
        line.push_str("  ");
        for byte in chunk {
            let c = *byte as char;
            line.push(if c.is_ascii_graphic() || c == ' ' { c } else { '.' });
        }
        trace!("{}", line);
    }
}
