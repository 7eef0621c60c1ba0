//! 设备隔离和乱序重排集成测试

use bytes::Bytes;
use scanbridge_core::{
    FragmentParts, FramingMode, RawFragment, SymbologyTable, TextEncoding, TokenKind,
    VendorProfile,
};
use scanbridge_lsk::{AssemblyState, DeviceSlot, DeviceTable, ReorderBuffer};

fn serial_profile() -> VendorProfile {
    VendorProfile {
        name: "serial".to_string(),
        actions: vec!["serial.port".to_string()],
        framing_mode: FramingMode::Streamed,
        type_table: SymbologyTable::new(TokenKind::Text),
        terminator: Some(b"\r\n".to_vec()),
        max_buffer: Some(64),
        gs1_placeholder: None,
        text_encoding: TextEncoding::Utf8,
        strip_control: true,
        aim_prefix: false,
    }
}

fn chunk(bytes: &[u8]) -> FragmentParts {
    FragmentParts {
        chunk: Some(Bytes::copy_from_slice(bytes)),
        ..Default::default()
    }
}

#[test]
fn test_concurrent_devices_do_not_share_assemblies() {
    println!("\n=== 测试多设备并发组装 ===\n");

    let table = DeviceTable::new();
    let profile = serial_profile();

    let results: Vec<(String, Vec<String>)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let table = &table;
                let profile = &profile;
                scope.spawn(move || {
                    let device_id = format!("com{n}");
                    let slot = table.get_or_insert_with(&device_id, || {
                        DeviceSlot::new(&device_id, profile, None, 16, 1 << 16)
                    });

                    let mut texts = Vec::new();
                    for i in 0..50 {
                        let payload = format!("D{n}-{i:03}");
                        let (head, tail) = payload.split_at(3);
                        let mut guard = slot.lock();
                        guard.state.update_receive();
                        assert!(guard.assembler.push(chunk(head.as_bytes())).unwrap().is_none());
                        let mut rest = tail.as_bytes().to_vec();
                        rest.extend_from_slice(b"\r\n");
                        if let Some(scan) = guard.assembler.push(chunk(&rest)).unwrap() {
                            texts.push(scan.text);
                        }
                    }
                    (device_id, texts)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (device_id, texts) in results {
        println!("  {device_id}: {} scans", texts.len());
        assert_eq!(texts.len(), 50);
        let prefix = format!("D{}-", &device_id[3..]);
        assert!(texts.iter().all(|t| t.starts_with(&prefix)));
        let state = table.get_device_state(&device_id).unwrap();
        assert_eq!(state.fragments_received, 50);
    }

    println!("\n✓ 多设备并发组装测试成功！\n");
}

#[test]
fn test_reordered_fragments_reproduce_sequential_result() {
    println!("\n=== 测试乱序片段重排 ===\n");

    let profile = serial_profile();
    let chunks: Vec<&[u8]> = vec![b"12", b"34", b"5\r", b"\n67", b"89\r\n"];

    // 顺序提交
    let mut sequential = DeviceSlot::new("com1", &profile, None, 16, 1 << 16);
    let mut expected = Vec::new();
    for c in &chunks {
        if let Some(scan) = sequential.assembler.push(chunk(c)).unwrap() {
            expected.push(scan.text);
        }
    }
    assert_eq!(expected, vec!["12345", "6789"]);

    // 乱序到达，经重排缓冲后提交
    let mut reordered = DeviceSlot::new("com1", &profile, None, 16, 1 << 16);
    let mut actual = Vec::new();
    for seq in [3u32, 0, 4, 2, 1] {
        let fragment = RawFragment::chunk("serial.port", chunks[seq as usize]);
        for ready in reordered.reorder.insert(seq, fragment) {
            let parts = chunk(match &ready.payload {
                scanbridge_core::Payload::Bytes { data, .. } => data,
                _ => unreachable!(),
            });
            if let Some(scan) = reordered.assembler.push(parts).unwrap() {
                actual.push(scan.text);
            }
        }
    }

    assert_eq!(actual, expected);
    assert_eq!(reordered.assembly_state(), AssemblyState::Idle);

    println!("\n✓ 乱序片段重排测试成功！\n");
}

#[test]
fn test_reorder_buffer_generic_items() {
    let mut buffer: ReorderBuffer<String> = ReorderBuffer::new(8, 1 << 16);
    assert!(buffer.insert(1, "b".to_string()).is_empty());
    assert_eq!(buffer.insert(0, "a".to_string()), vec!["a", "b"]);
}
