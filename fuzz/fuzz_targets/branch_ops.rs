#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use trunkrs::{BodyError, Branch, BufferFactory};

// First byte picks the payload length; the rest drive branch operations.
fuzz_target!(|input: &[u8]| {
    let Some((&len, ops)) = input.split_first() else {
        return;
    };
    let data: Vec<u8> = (0..len as usize * 4).map(|i| (i * 31 + 7) as u8).collect();

    // Small limits so spilling and overflow both get exercised
    let factory = BufferFactory::new(8, 64, 512).unwrap();
    let mut live: Vec<(Branch, usize)> = vec![(Branch::wrap(Cursor::new(data.clone()), factory), 0)];
    let mut overflowed = false;

    for pair in ops.chunks(2) {
        if live.is_empty() {
            break;
        }
        let target = pair[0] as usize % live.len();
        let arg = pair.get(1).copied().unwrap_or(1) as usize;

        match pair[0] % 4 {
            0 | 1 => {
                let (branch, pos) = &mut live[target];
                let mut buf = vec![0u8; arg + 1];
                match branch.read_bytes(&mut buf) {
                    Ok(n) => {
                        assert!(!overflowed, "read succeeded after an overflow");
                        assert_eq!(&buf[..n], &data[*pos..*pos + n]);
                        *pos += n;
                    }
                    Err(BodyError::Overflow { .. }) => overflowed = true,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
            2 => {
                let (parent, pos) = &live[target];
                let pos = *pos;
                let child = parent.branch().unwrap();
                live.push((child, pos));
            }
            _ => {
                let (mut branch, _) = live.remove(target);
                branch.close().unwrap();
                live.retain(|(b, _)| !b.is_closed());
            }
        }
    }
});
