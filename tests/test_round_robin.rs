//! Round-robin dispatch through the full [`Kernel`] facade, not just the
//! scheduler mechanism in isolation.

use sched_core::alloc_iface::BitmapStackPool;
use sched_core::kernel::Kernel;
use sched_core::{KernelConfig, Pid};

fn kernel_with_quantum(quantum: u32) -> Kernel {
    let mut config = KernelConfig::default();
    config.round_robin_quantum = quantum;
    Kernel::new(config, Box::new(BitmapStackPool::new(0x1000, 1 << 16, 16)))
}

fn spawn(k: &Kernel, name: &str) -> Pid {
    let pid = k.create(name, 0, 0, 256).unwrap();
    k.publish(pid).unwrap();
    pid
}

#[test]
fn three_pcbs_rotate_in_arrival_order_under_a_two_tick_quantum() {
    let k = kernel_with_quantum(2);
    let a = spawn(&k, "a");
    let b = spawn(&k, "b");
    let c = spawn(&k, "c");

    let mut observed = Vec::new();
    for _ in 0..9 {
        k.tick();
        observed.push(k.current().unwrap());
    }

    assert_eq!(observed, vec![a, a, b, b, c, c, a, a, b]);
}

#[test]
fn a_pcb_that_exits_drops_out_of_the_rotation() {
    let k = kernel_with_quantum(1);
    let a = spawn(&k, "a");
    let b = spawn(&k, "b");

    k.tick();
    assert_eq!(k.current(), Some(a));
    k.exit(a).unwrap();
    k.tick();
    assert_eq!(k.current(), Some(b));
    // with `a` gone, `b` keeps the CPU tick after tick.
    k.tick();
    assert_eq!(k.current(), Some(b));
}
