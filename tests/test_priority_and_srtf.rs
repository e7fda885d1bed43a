//! Preemptive policies driven end-to-end through the [`Kernel`] facade: a
//! higher-priority (or shorter-remaining-work) arrival takes the CPU away
//! from whatever is currently running.

use sched_core::alloc_iface::BitmapStackPool;
use sched_core::kernel::Kernel;
use sched_core::KernelConfig;

fn kernel() -> Kernel {
    Kernel::new(KernelConfig::default(), Box::new(BitmapStackPool::new(0x1000, 1 << 16, 16)))
}

#[test]
fn a_higher_priority_arrival_preempts_the_running_pcb_next_tick() {
    let k = kernel();
    k.set_policy("priority").unwrap();

    let low_priority = k.create("background", 0, 1, 256).unwrap();
    k.publish(low_priority).unwrap();
    k.tick();
    assert_eq!(k.current(), Some(low_priority));

    let high_priority = k.create("urgent", 0, 30, 256).unwrap();
    k.publish(high_priority).unwrap();
    k.tick();
    assert_eq!(k.current(), Some(high_priority));
}

#[test]
fn srtf_prefers_the_pcb_with_less_remaining_work() {
    let k = kernel();
    k.set_policy("srtf").unwrap();

    let long_job = k.create("long", 0, 0, 256).unwrap();
    k.set_workload(long_job, 20, 20).unwrap();
    k.publish(long_job).unwrap();
    k.tick();
    assert_eq!(k.current(), Some(long_job));

    let short_job = k.create("short", 0, 0, 256).unwrap();
    k.set_workload(short_job, 2, 2).unwrap();
    k.publish(short_job).unwrap();
    k.tick();
    assert_eq!(k.current(), Some(short_job));
}
