pub fn hexdump(buffer: &[u8], start: u32) -> String {
    let mut str = String::new();

    for (row, chunk) in buffer.chunks(16).enumerate() {
        let addr = start.wrapping_add(row as u32 * 16);
        let mut line = format!("{:05x}: ", addr);
        let mut chars = String::new();
        for &byte in chunk {
            line.push_str(&format!("{:02x} ", byte));
            let c = byte as char;
            chars.push(if c.is_ascii_graphic() || c == ' ' {
                c
            } else {
                '.'
            });
        }

        str.push_str(&format!("{:<55} {}\n", line, chars));
    }

    str
}
