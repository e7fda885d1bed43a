//! `schedctl` — diagnostic CLI over a single in-process [`sched_core::Kernel`]
//! (spec §6). Every invocation is a fresh kernel: this is a harness for
//! driving the scheduler by hand, not a long-running service.

use clap::{Parser, Subcommand};

use sched_core::alloc_iface::BitmapStackPool;
use sched_core::ipc::MailboxId;
use sched_core::kernel::Kernel;
use sched_core::pcb::Pid;
use sched_core::sync::{MutexId, SemId};
use sched_core::{CoreResult, KernelConfig};

#[derive(Parser)]
#[command(name = "schedctl")]
#[command(about = "drive and inspect a sched-core kernel instance")]
struct Cli {
    /// Scheduling policy to start with: fcfs, rr, priority, sjf, srtf, mlfq
    #[arg(long, default_value = "rr")]
    policy: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Spawn `count` processes with the given CPU burst, publish them ready,
    /// then run `ticks` of the scheduler and print the dispatch log.
    Spawn {
        #[arg(long, default_value_t = 3)]
        count: u32,
        #[arg(long, default_value_t = 10)]
        burst: u32,
        #[arg(long, default_value_t = 20)]
        ticks: u64,
    },
    /// Run a fixed number of ticks against an empty process table.
    Simulate {
        #[arg(long, default_value_t = 10)]
        ticks: u64,
    },
    /// Spawn `count` processes (0 for none) and print the process table.
    Ps {
        #[arg(long, default_value_t = 0)]
        count: u32,
        #[arg(long, default_value_t = 10)]
        burst: u32,
    },
    /// Kill a pid and print the resulting process table.
    Kill { pid: u32 },
    /// Switch the active scheduling policy.
    Sched { policy: String },
    /// Spawn `count` processes and print the ready/running state of each.
    Queue {
        #[arg(long, default_value_t = 3)]
        count: u32,
        #[arg(long, default_value_t = 10)]
        burst: u32,
    },
    /// Spawn `count` processes, run `ticks`, and print the dispatch log.
    Log {
        #[arg(long, default_value_t = 3)]
        count: u32,
        #[arg(long, default_value_t = 10)]
        burst: u32,
        #[arg(long, default_value_t = 10)]
        ticks: u64,
    },
    /// Voluntarily block a pid with no associated resource.
    Block { pid: u32 },
    /// Wake a pid blocked with no associated resource.
    Unblock { pid: u32 },
    /// Mailbox operations.
    Mbox {
        #[command(subcommand)]
        action: MboxAction,
    },
    /// Mutex operations.
    Mutex {
        #[command(subcommand)]
        action: MutexAction,
    },
    /// Semaphore operations.
    Sem {
        #[command(subcommand)]
        action: SemAction,
    },
}

#[derive(Subcommand)]
enum MboxAction {
    Create {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = 4)]
        capacity: usize,
        #[arg(long, default_value_t = 64)]
        msg_size: usize,
    },
    Destroy { id: u32 },
    Send { id: u32, sender: u32, payload: String },
    Recv { id: u32 },
}

#[derive(Subcommand)]
enum MutexAction {
    Create {
        #[arg(long)]
        name: Option<String>,
    },
    Lock { id: u32, pid: u32 },
    Unlock { id: u32, pid: u32 },
}

#[derive(Subcommand)]
enum SemAction {
    Create {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = 0)]
        initial: i64,
    },
    Wait { id: u32, pid: u32 },
    Post { id: u32 },
}

/// Spawn `count` PCBs with the given CPU burst, published and ready. Shared
/// by every command that needs a process table to act on.
fn spawn_fleet(kernel: &Kernel, count: u32, burst: u32) -> Vec<Pid> {
    let mut pids = Vec::with_capacity(count as usize);
    for i in 0..count {
        let pid = kernel
            .create(&format!("proc{i}"), 0, 10, 4096)
            .expect("process table has room for a small demo fleet");
        kernel.set_workload(pid, burst, burst).expect("pid was just created");
        kernel.publish(pid).expect("freshly created pid is always New");
        pids.push(pid);
    }
    pids
}

fn print_table(kernel: &Kernel) {
    println!("{:<5} {:<10} {:<18} {:<8}", "pid", "name", "state", "ticks");
    for pcb in kernel.list() {
        println!(
            "{:<5} {:<10} {:<18} {:<8}",
            pcb.pid,
            pcb.name.as_str(),
            format!("{:?}", pcb.state),
            pcb.total_ticks
        );
    }
}

fn print_log(kernel: &Kernel) {
    println!("execution log:");
    for entry in kernel.log_snapshot() {
        println!(
            "  pid {:<4} \"{}\" [{}..{}] ({} ticks)",
            entry.pid,
            entry.name.as_str(),
            entry.start_tick,
            entry.end_tick,
            entry.duration
        );
    }
}

/// Print spec §6's "single descriptive error line" and exit non-zero, or
/// print nothing and fall through on success — commands either succeed
/// silently or report exactly one error.
fn report<T>(result: CoreResult<T>) {
    if let Err(e) = result {
        eprintln!("schedctl: {e}");
        std::process::exit(1);
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let kernel = Kernel::new(KernelConfig::default(), Box::new(BitmapStackPool::new(0x1000, 1 << 16, 64)));
    if let Err(e) = kernel.set_policy(&cli.policy) {
        eprintln!("schedctl: unknown policy \"{}\": {}", cli.policy, e);
        std::process::exit(1);
    }

    match cli.command {
        Commands::Spawn { count, burst, ticks } => {
            let pids = spawn_fleet(&kernel, count, burst);
            println!("spawned {} processes under policy \"{}\"", pids.len(), kernel.policy_name());

            kernel.simulate(ticks);

            println!();
            print_table(&kernel);
            println!();
            print_log(&kernel);
        }
        Commands::Simulate { ticks } => {
            kernel.simulate(ticks);
            println!("ran {ticks} ticks with no processes published; now = {}", kernel.now());
        }
        Commands::Ps { count, burst } => {
            spawn_fleet(&kernel, count, burst);
            print_table(&kernel);
        }
        Commands::Kill { pid } => {
            report(kernel.kill(Pid(pid)));
            print_table(&kernel);
        }
        Commands::Sched { policy } => {
            report(kernel.set_policy(&policy));
            println!("policy: {}", kernel.policy_name());
        }
        Commands::Queue { count, burst } => {
            spawn_fleet(&kernel, count, burst);
            kernel.tick();
            print_table(&kernel);
        }
        Commands::Log { count, burst, ticks } => {
            spawn_fleet(&kernel, count, burst);
            kernel.simulate(ticks);
            print_log(&kernel);
        }
        Commands::Block { pid } => {
            report(kernel.sleep(Pid(pid)));
            println!("pid {pid} blocked");
        }
        Commands::Unblock { pid } => {
            report(kernel.wake(Pid(pid)));
            println!("pid {pid} unblocked");
        }
        Commands::Mbox { action } => match action {
            MboxAction::Create { name, capacity, msg_size } => {
                match kernel.mailbox_create(name.as_deref(), capacity, msg_size) {
                    Ok(id) => println!("created mailbox {id}"),
                    Err(e) => {
                        eprintln!("schedctl: {e}");
                        std::process::exit(1);
                    }
                }
            }
            MboxAction::Destroy { id } => {
                report(kernel.mailbox_destroy(MailboxId(id)));
                println!("destroyed mailbox {id}");
            }
            MboxAction::Send { id, sender, payload } => {
                report(kernel.mailbox_send(MailboxId(id), Pid(sender), payload.as_bytes()));
                println!("sent {} bytes to mailbox {id}", payload.len());
            }
            MboxAction::Recv { id } => match kernel.mailbox_recv(MailboxId(id)) {
                Ok(msg) => println!(
                    "received {} bytes from pid {}: {:?}",
                    msg.payload.len(),
                    msg.sender_pid,
                    String::from_utf8_lossy(&msg.payload)
                ),
                Err(e) => {
                    eprintln!("schedctl: {e}");
                    std::process::exit(1);
                }
            },
        },
        Commands::Mutex { action } => match action {
            MutexAction::Create { name } => match kernel.mutex_create(name.as_deref()) {
                Ok(id) => println!("created mutex {id}"),
                Err(e) => {
                    eprintln!("schedctl: {e}");
                    std::process::exit(1);
                }
            },
            MutexAction::Lock { id, pid } => {
                report(kernel.mutex_trylock(MutexId(id), Pid(pid)));
                println!("pid {pid} holds mutex {id}");
            }
            MutexAction::Unlock { id, pid } => {
                report(kernel.mutex_unlock(MutexId(id), Pid(pid)));
                println!("pid {pid} released mutex {id}");
            }
        },
        Commands::Sem { action } => match action {
            SemAction::Create { name, initial } => match kernel.sem_create(name.as_deref(), initial) {
                Ok(id) => println!("created semaphore {id}"),
                Err(e) => {
                    eprintln!("schedctl: {e}");
                    std::process::exit(1);
                }
            },
            SemAction::Wait { id, pid } => {
                report(kernel.sem_trywait(SemId(id)));
                println!("pid {pid} acquired semaphore {id}");
            }
            SemAction::Post { id } => {
                report(kernel.sem_post(SemId(id)));
                println!("posted semaphore {id}");
            }
        },
    }
}
