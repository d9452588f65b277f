//! `descriptor_lifecycle` 集成测试：从 `open` 到 `close` 驱动 ISOTP IO 资源。
//!
//! # 测试总览（Why）
//! - 以脚本化连接器替代 CAN 套接字，覆盖打开、累积读取、直通写入与关闭的完整生命周期；
//! - 重点断言失败路径不会遗留连接，累积不会移动游标，策略拒绝先于一切检查。

use std::{
    io::{ErrorKind, SeekFrom},
    sync::{Arc, Mutex},
};

use proptest::prelude::*;
use spark_io_isotp::{
    AccumulateEvent, ISOTP_PLUGIN, IsotpIo, IsotpIoConfig, ObserverError, OpenError,
    OpenOutcome, Permissions, SandboxMode, USAGE,
};
use spark_transport::{
    TransportEndpoint,
    scripted::{ScriptHandle, ScriptedConnector, ScriptedTransport},
};

fn resource(handle: &ScriptHandle) -> IsotpIo<ScriptedConnector, SandboxMode> {
    IsotpIo::new(handle.connector(), SandboxMode::Unrestricted)
}

fn open(
    io: &IsotpIo<ScriptedConnector, SandboxMode>,
    uri: &str,
) -> spark_io_isotp::IsotpDescriptor<ScriptedTransport> {
    io.open(uri, Permissions::READ)
        .expect("脚本端点可达")
        .into_descriptor()
        .expect("应返回描述符")
}

/// 场景 A：打开成功后缓冲只有 1 字节基线，游标为 0，权限被提升为读写。
#[test]
fn open_yields_single_byte_baseline() {
    let handle = ScriptHandle::new();
    let io = resource(&handle);
    assert!(io.accepts("isotp://can0/100/101"));

    let desc = open(&io, "isotp://can0/100/101");
    assert_eq!(desc.size(), 1);
    assert_eq!(desc.offset(), 0);
    assert_eq!(desc.permissions(), Permissions::READ_WRITE);
    assert_eq!(
        desc.endpoint(),
        &TransportEndpoint::new("can0", "100", "101")
    );
    assert_eq!(handle.connects(), 1);
}

/// 场景 B：一帧 10 字节报文在一次读取中被累积，并与基线字节一起返回。
#[test]
fn read_accumulates_pending_frame_before_serving() {
    let handle = ScriptHandle::new();
    let io = resource(&handle);
    let mut desc = open(&io, "isotp://can0/100/101");

    let frame: Vec<u8> = (1..=10).collect();
    handle.push_frame(frame.clone());

    let chunk = desc.read(20);
    assert_eq!(desc.size(), 11);
    assert_eq!(desc.frame_count(), 1);
    assert_eq!(chunk.len(), 11);
    assert_eq!(chunk[0], 0, "基线字节位于偏移 0");
    assert_eq!(&chunk[1..], frame.as_slice());
    assert_eq!(desc.offset(), 11);
}

/// 场景 C：没有新报文时累积为空操作，读取返回唯一的基线字节。
#[test]
fn empty_transport_serves_baseline_only() {
    let handle = ScriptHandle::new();
    let io = resource(&handle);
    let mut desc = open(&io, "isotp://can0/100/101");

    let chunk = desc.read(5);
    assert_eq!(chunk.as_ref(), &[0]);
    assert_eq!(desc.size(), 1);
    assert_eq!(desc.frame_count(), 0);
    assert_eq!(handle.read_calls(), 1);
}

/// 场景 D：短写按实际接受的字节数返回，缓冲不受影响。
#[test]
fn short_write_is_reported_as_is() {
    let handle = ScriptHandle::new();
    handle.limit_writes(1);
    let io = resource(&handle);
    let mut desc = open(&io, "isotp://can0/100/101");

    let written = desc.write(&[0xAA, 0xBB]).expect("短写不是错误");
    assert_eq!(written, 1);
    assert_eq!(desc.size(), 1);
    assert_eq!(handle.written(), vec![vec![0xAA]]);
    assert_eq!(handle.read_calls(), 0, "写入不触发累积");
}

#[test]
fn failed_write_surfaces_transport_error() {
    let handle = ScriptHandle::new();
    handle.fail_writes(ErrorKind::BrokenPipe);
    let io = resource(&handle);
    let mut desc = open(&io, "isotp://can0/100/101");

    let err = desc.write(b"x").expect_err("写失败应上抛");
    assert_eq!(
        err.io_cause().map(|cause| cause.kind()),
        Some(ErrorKind::BrokenPipe)
    );
}

/// 场景 E：关闭后不再有存活的连接。
#[test]
fn close_releases_transport() {
    let handle = ScriptHandle::new();
    let io = resource(&handle);
    let desc = open(&io, "isotp://can0/100/101");
    assert_eq!(handle.live_transports(), 1);

    desc.close();
    assert!(handle.is_closed());
    assert_eq!(handle.live_transports(), 0);
}

#[test]
fn dropping_descriptor_also_releases_transport() {
    let handle = ScriptHandle::new();
    let io = resource(&handle);
    drop(open(&io, "isotp://can0/100/101"));
    assert!(handle.is_closed());
}

#[test]
fn sandbox_denies_before_parsing() {
    let handle = ScriptHandle::new();
    let io = IsotpIo::new(handle.connector(), SandboxMode::Sandboxed);

    for uri in ["isotp://can0/100/101", "isotp://?", "isotp://", "file:///etc/passwd"] {
        let err = io.open(uri, Permissions::READ).expect_err("沙箱模式下必须拒绝");
        assert!(matches!(err, OpenError::PolicyDenied), "{uri}: {err}");
    }
    let err = io
        .open_endpoint(&TransportEndpoint::new("", "", ""), Permissions::READ)
        .expect_err("沙箱模式下必须拒绝");
    assert!(matches!(err, OpenError::PolicyDenied));
    assert_eq!(handle.connects(), 0);
}

#[test]
fn closure_policy_is_consulted_once_per_open() {
    let handle = ScriptHandle::new();
    let checks = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&checks);
    let io = IsotpIo::new(handle.connector(), move || {
        *counter.lock().expect("计数锁") += 1;
        false
    });

    let outcome = io
        .open("isotp://can0/100/101", Permissions::READ)
        .expect("策略放行");
    assert!(!outcome.is_usage());
    assert_eq!(*checks.lock().expect("计数锁"), 1);
}

#[test]
fn help_form_returns_usage_without_connecting() {
    let handle = ScriptHandle::new();
    let io = resource(&handle);

    let outcome = io.open("isotp://?", Permissions::READ).expect("帮助请求不是错误");
    assert!(matches!(outcome, OpenOutcome::Usage(text) if text == USAGE));
    assert_eq!(handle.connects(), 0);
    assert_eq!(handle.live_transports(), 0);
}

#[test]
fn foreign_scheme_is_unsupported() {
    let handle = ScriptHandle::new();
    let io = resource(&handle);
    assert!(!io.accepts("tcp://127.0.0.1:9000"));

    let err = io
        .open("tcp://127.0.0.1:9000", Permissions::READ)
        .expect_err("非 isotp 前缀");
    assert!(matches!(err, OpenError::UnsupportedUri { ref uri } if uri == "tcp://127.0.0.1:9000"));
}

#[test]
fn refused_connection_leaves_nothing_open() {
    let handle = ScriptHandle::new();
    handle.refuse_connections();
    let io = resource(&handle);

    let err = io
        .open("isotp://can0/100/101", Permissions::READ_WRITE)
        .expect_err("端点不可达");
    match err {
        OpenError::ConnectFailed { endpoint, .. } => assert_eq!(endpoint.interface(), "can0"),
        other => panic!("应为 ConnectFailed: {other}"),
    }
    assert_eq!(handle.live_transports(), 0);
}

#[test]
fn malformed_uri_fails_to_connect() {
    let handle = ScriptHandle::new();
    let io = resource(&handle);

    let err = io
        .open("isotp:///100/101", Permissions::READ)
        .expect_err("接口名为空");
    assert!(matches!(err, OpenError::ConnectFailed { .. }));
    assert_eq!(handle.connects(), 0);
}

#[test]
fn observer_receives_every_accumulate_event() {
    let handle = ScriptHandle::new();
    let io = resource(&handle);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let mut desc = open(&io, "isotp://can0/100/101").with_observer(
        move |event: &AccumulateEvent| -> Result<(), ObserverError> {
            sink.lock().expect("事件锁").push(*event);
            Ok(())
        },
    );

    handle.push_frame(b"ab".to_vec());
    desc.read(0);
    desc.read(0);
    handle.push_frame(b"cde".to_vec());
    desc.read(0);

    let events = events.lock().expect("事件锁").clone();
    assert_eq!(
        events,
        vec![
            AccumulateEvent {
                sequence: 0,
                bytes_added: 2,
                total_size: 3
            },
            AccumulateEvent {
                sequence: 1,
                bytes_added: 3,
                total_size: 6
            },
        ]
    );
    assert_eq!(desc.offset(), 0, "零长度读取不推进游标");
}

#[test]
fn capped_resource_leaves_messages_queued_instead_of_cutting_them() {
    let handle = ScriptHandle::new();
    let config = IsotpIoConfig {
        max_buffer_size: Some(1 + 4096 + 100),
        ..IsotpIoConfig::default()
    };
    let io = resource(&handle).with_config(config);
    let mut desc = open(&io, "isotp://can0/100/101");

    handle.push_frame(vec![0x11; 3000]);
    handle.push_frame(vec![0x22; 3000]);
    desc.read(0);
    desc.read(0);
    assert_eq!(desc.size(), 3001);
    assert_eq!(handle.read_calls(), 1, "剩余容量不足一个读块时不再读取");
    assert_eq!(handle.pending_frames(), 1, "第二条报文完整留在连接中");
    assert_eq!(handle.truncated_bytes(), 0);
}

/// 缓冲分配失败时，已经建立的连接必须先被关闭。
#[test]
fn allocation_failure_closes_transport() {
    let handle = ScriptHandle::new();
    let config = IsotpIoConfig {
        initial_size: usize::MAX,
        ..IsotpIoConfig::default()
    };
    let io = resource(&handle).with_config(config);

    let err = io
        .open("isotp://can0/100/101", Permissions::READ)
        .expect_err("无法分配基线缓冲");
    assert!(matches!(err, OpenError::AllocationFailed(_)), "{err}");
    assert_eq!(handle.connects(), 1, "连接先于分配建立");
    assert_eq!(handle.live_transports(), 0, "分配失败不得遗留连接");
}

#[test]
fn seek_is_relative_to_accumulated_size() {
    let handle = ScriptHandle::new();
    let io = resource(&handle);
    let mut desc = open(&io, "isotp://can0/100/101");
    handle.push_frame(b"0123456789".to_vec());
    desc.read(0);

    assert_eq!(desc.seek(SeekFrom::End(-3)).expect("相对尾部"), 8);
    assert_eq!(desc.read(16).as_ref(), b"789");
    assert!(desc.seek(SeekFrom::Start(0)).is_ok());
    assert!(desc.seek(SeekFrom::Current(-1)).is_err());
}

#[test]
fn plugin_descriptor_names_the_scheme() {
    assert_eq!(ISOTP_PLUGIN.name, "isotp");
    assert_eq!(ISOTP_PLUGIN.uris, "isotp://");
    assert_eq!(ISOTP_PLUGIN.license, "MIT");
    assert!(ISOTP_PLUGIN.description.contains("isotp://interface/srcid/dstid"));
    assert!(!ISOTP_PLUGIN.version.is_empty());
}

proptest! {
    /// 无论游标位于何处，读取触发的累积都只增加长度，读取结果只取决于调用时的游标。
    #[test]
    fn prop_reads_never_skip_accumulated_bytes(
        frames in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..32), 1..8),
        cursor in 0u64..64,
        len in 0usize..64,
    ) {
        let handle = ScriptHandle::new();
        let io = resource(&handle);
        let mut desc = open(&io, "isotp://vcan0/0x7E0/0x7E8");
        desc.seek(SeekFrom::Start(cursor)).expect("非负定位");

        let mut expected = vec![0u8];
        for frame in &frames {
            handle.push_frame(frame.clone());
        }
        expected.extend_from_slice(&frames[0]);

        let chunk = desc.read(len);
        prop_assert_eq!(desc.size(), expected.len());
        let start = (cursor as usize).min(expected.len());
        let end = start.saturating_add(len).min(expected.len());
        prop_assert_eq!(chunk.as_ref(), &expected[start..end]);
        prop_assert_eq!(desc.offset(), cursor + (end - start) as u64);
    }

    /// 策略受限时，任意地址都以 `PolicyDenied` 失败且不会建连。
    #[test]
    fn prop_policy_denial_ignores_endpoint(uri in "\\PC*") {
        let handle = ScriptHandle::new();
        let io = IsotpIo::new(handle.connector(), SandboxMode::Sandboxed);
        let denied = matches!(io.open(&uri, Permissions::READ), Err(OpenError::PolicyDenied));
        prop_assert!(denied);
        prop_assert_eq!(handle.connects(), 0);
    }
}
