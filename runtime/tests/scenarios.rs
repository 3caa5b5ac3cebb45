//! End-to-end exercises of the assembled runtime: the concrete scenarios
//! the subsystems are specified against, run across crate boundaries.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing_subscriber::util::SubscriberInitExt;

use ember::bus::{MessageBus, packet_set};
use ember::diag::{LogSeverity, LoggerCreateInfo, record, record_argument, text_format};
use ember::linear::{Array, List, UniquePtr};
use ember::pool::{PoolThread, ScheduleError, task_fn};
use ember::text::Path32;
use ember::{Runtime, RuntimeCreateInfo};

struct GeneralThread;
impl PoolThread for GeneralThread {}

fn runtime_with_workers(count: usize) -> Runtime {
    let mut runtime = Runtime::new(&RuntimeCreateInfo {
        logger: LoggerCreateInfo {
            print_to_system_console: false,
            ..LoggerCreateInfo::default()
        },
    });
    for _ in 0..count {
        runtime
            .thread_pool_mut()
            .add_thread(GeneralThread)
            .expect("worker must start");
    }
    runtime
}

#[test]
fn array_access_is_bounds_checked() {
    let array = Array::new([5_u32, 10, 20]);
    assert_eq!(array[2], 20);
    assert!(
        std::panic::catch_unwind(|| array[3]).is_err(),
        "out-of-bounds indexing must raise"
    );
}

#[test]
fn list_erase_range_scenario() {
    let mut list: List<u32> = (0..10).collect();
    list.erase_range(3..list.len() - 3);
    assert_eq!(list, [0, 1, 2, 7, 8, 9]);
}

#[test]
fn path_collapses_to_a_single_parent_segment() {
    let path = Path32::parse("t1/t2/t3/../../../..");
    assert_eq!(path.len(), 1);
    assert_eq!(path[0], "..");
    assert_eq!(path, "..");
}

#[test]
fn text_format_scenario() {
    let formatted = text_format!("Arguments {} in middle: {}", "embedded", 5);
    assert_eq!(formatted, "Arguments embedded in middle: 5");

    // Unknown flags raise the runtime's own exception type.
    let caught =
        std::panic::catch_unwind(|| text_format!("{a}", "value")).expect_err("must throw");
    assert!(caught.downcast::<ember::diag::Exception>().is_ok());
}

#[test]
fn throwing_task_reaches_the_main_thread_with_context() {
    let _trace = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_names(true)
        .set_default();

    let mut runtime = runtime_with_workers(2);

    runtime
        .thread_pool_mut()
        .schedule(task_fn(|| panic!("asset import failed")))
        .unwrap();

    let error = loop {
        match runtime.thread_pool_mut().run() {
            Err(error) => break error,
            Ok(()) => std::thread::sleep(std::time::Duration::from_millis(1)),
        }
    };

    let text = error.message().to_plain_text().to_string();
    assert!(text.contains("Exception thrown in thread"));
    let cause = error.next().expect("inner cause carries the original message");
    assert!(
        cause
            .message()
            .to_plain_text()
            .to_string()
            .contains("asset import failed")
    );

    // The pool stays faulted.
    assert_eq!(
        runtime.thread_pool_mut().schedule(task_fn(|| ())),
        Err(ScheduleError::Faulted)
    );
}

#[derive(Debug)]
struct FramePacket(u32);

#[derive(Debug)]
struct InputPacket(#[expect(dead_code, reason = "payload only moves")] String);

packet_set! {
    struct ScenarioPackets: FramePacket, InputPacket;
}

#[test]
fn message_bus_claim_scenario() {
    let bus: MessageBus<ScenarioPackets> = MessageBus::new();

    let id = bus.send_packet(UniquePtr::new(FramePacket(60)));
    assert_eq!(id, 1);

    // Claim with the wrong type: empty, packet remains.
    assert!(bus.claim_packet::<InputPacket>(id).is_none());

    // Claim with the right type: the packet moves out.
    let packet = bus.claim_packet::<FramePacket>(id).expect("first claim");
    assert_eq!(packet.0, 60);

    // Second claim of the same id: empty.
    assert!(bus.claim_packet::<FramePacket>(id).is_none());
}

#[test]
fn worker_tasks_log_through_the_shared_logger() {
    let mut runtime = runtime_with_workers(2);
    let logger = Arc::clone(runtime.logger());
    let done = Arc::new(AtomicUsize::new(0));

    for frame in 0..4_u32 {
        let logger = Arc::clone(&logger);
        let done = Arc::clone(&done);
        runtime
            .thread_pool_mut()
            .schedule(task_fn(move || {
                logger.info(record_argument("frame presented", frame));
                done.fetch_add(1, Ordering::Relaxed);
            }))
            .unwrap();
    }
    runtime.thread_pool_mut().wait_idle().unwrap();

    assert_eq!(done.load(Ordering::Relaxed), 4);
    assert_eq!(logger.log_history().len(), 4);
    assert_eq!(logger.recorded_total(), 4);
}

#[test]
fn wait_idle_leaves_an_empty_queue() {
    let mut runtime = runtime_with_workers(3);
    for _ in 0..16 {
        runtime
            .thread_pool_mut()
            .schedule(task_fn(|| {
                std::thread::sleep(std::time::Duration::from_micros(200));
            }))
            .unwrap();
    }
    runtime.thread_pool_mut().wait_idle().unwrap();
    assert_eq!(runtime.thread_pool().task_queue_count(), 0);
}

#[test]
fn finalisation_laws_hold_for_composed_records() {
    let mut composed = record("stage: upload\n");
    let mut detail = record_argument("buffer", 3);
    detail.add_indent(2);
    composed.append(&detail);

    let line_count = composed.line_count();
    let once = composed.finalized(4);
    assert_eq!(once.line_count(), line_count);
    assert_eq!(once.finalized(4).to_plain_text(), once.to_plain_text());

    let mut indented = composed.clone();
    indented.add_indent(5);
    assert_eq!(indented.finalized(4).line_count(), line_count);
}

#[test]
fn severity_thresholds_gate_the_history() {
    let runtime = Runtime::new(&RuntimeCreateInfo {
        logger: LoggerCreateInfo {
            minimum_report_severity: LogSeverity::Warning,
            print_to_system_console: false,
            ..LoggerCreateInfo::default()
        },
    });
    let logger = runtime.logger();
    logger.verbose(record("invisible"));
    logger.warning(record("visible"));
    logger.critical_error(record("always visible"));
    assert_eq!(logger.log_history().len(), 2);
}
