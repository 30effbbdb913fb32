mod config;
mod epoll;
#[cfg(not(feature = "logging"))]
mod errorlog;
mod mtslots;
mod probe;

use epoll::Epoll;
use evdev_rs::Device as EvDevice;
#[allow(unused)]
use log::{debug, error, info, trace, warn};
use std::io::ErrorKind;
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use touchpad_core::touchpad::clock::MonotonicClock;
use touchpad_core::Touchpad;

static SIGHUP: AtomicBool = AtomicBool::new(false);

fn print_version<W: std::io::Write>(target: &mut W) {
    let _ = writeln!(target, "touchpadd {}", env!("CARGO_PKG_VERSION"));
}

fn print_help<W: std::io::Write>(target: &mut W) {
    print_version(&mut *target);
    for line in [
        "",
        "Usage: touchpadd [OPTIONS]",
        "",
        "Options:",
        "  -h --help     Print this help message",
        "  -V --version  Print version info",
        "",
        "A valid touchpad-core config file must be installed to one of the",
        "following locations before executing touchpadd:",
    ] {
        writeln!(target, "{line}").ok();
    }

    for dir in config::config_dirs() {
        writeln!(target, "  * {dir}").ok();
    }
}

#[cfg(feature = "logging")]
fn init_logger() {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();
}

#[cfg(not(feature = "logging"))]
fn init_logger() {
    errorlog::init();
}

extern "C" fn on_sighup(_: libc::c_int) {
    SIGHUP.store(true, Ordering::Relaxed);
}

fn main() {
    init_logger();

    let args = std::env::args();
    #[allow(clippy::never_loop)]
    for arg in args.skip(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help(&mut std::io::stdout());
                std::process::exit(0);
            }
            "-V" | "--version" => {
                print_version(&mut std::io::stdout());
                std::process::exit(0);
            }
            _ => {
                eprintln!("{arg}: Invalid option!");
                eprintln!("Try 'touchpadd --help' for more info");
                std::process::exit(-1);
            }
        }
    }

    // Install a SIGHUP handler to tell us to reload the configuration file.
    unsafe {
        let result = libc::signal(libc::SIGHUP, on_sighup as libc::sighandler_t);
        assert_eq!(result, 0);
    }

    loop {
        let config = config::load();
        if config.devices.is_empty() {
            error!("No configured devices");
            std::process::exit(-1);
        }

        std::thread::scope(|scope| {
            watch_devices(scope, config);

            // We hang here until all device watcher threads have terminated.
            // That's OK for now, but in case of SIGHUP the worker threads won't notice the signal
            // until they wake after receiving an epoll(7) event or timer expiry.
        });

        if SIGHUP.swap(false, Ordering::Relaxed) {
            info!("Reloading after SIGHUP");
            continue;
        }
        break;
    }
}

fn watch_devices<'scope>(scope: &'scope std::thread::Scope<'scope, '_>, config: config::Configuration) {
    for (device_path, overrides) in config.devices {
        let device = match EvDevice::new_from_path(&device_path) {
            Ok(device) => device,
            Err(e) => {
                error!("{device_path}: {e}");
                continue;
            }
        };

        let touchpad_config = match probe::probe_touchpad_config(&device, &overrides) {
            Some(cfg) => cfg,
            None => {
                error!("{device_path}: does not look like a touchpad, skipping");
                continue;
            }
        };

        let device_fd = device.file().as_raw_fd();
        scope.spawn(move || {
            use evdev_rs::enums::EventCode;
            use evdev_rs::{InputEvent, ReadFlag, ReadStatus};

            let mut epoll = Epoll::new().unwrap();
            let token = epoll.register_read(device_fd, false).unwrap();

            let num_slots = touchpad_config.num_slots;
            let mut touchpad = Touchpad::new(touchpad_config, Box::new(MonotonicClock));
            touchpad.set_slot_source(Box::new(mtslots::EvdevSlotSource::new(device_fd, num_slots)));
            let mut read_flag = ReadFlag::NORMAL;

            'device: loop {
                if SIGHUP.load(Ordering::Relaxed) {
                    debug!("{device_path}: exiting because SIGHUP was set");
                    return;
                }
                let event = match device.next_event(read_flag) {
                    Ok((ReadStatus::Success, event)) => event,
                    Ok((
                        ReadStatus::Sync,
                        InputEvent {
                            event_code: EventCode::EV_SYN(evdev_rs::enums::EV_SYN::SYN_DROPPED),
                            ..
                        },
                    )) => {
                        read_flag = ReadFlag::SYNC;
                        continue;
                    }
                    Ok((ReadStatus::Sync, event)) => event,
                    Err(e) if e.kind() == ErrorKind::WouldBlock => {
                        read_flag = ReadFlag::NORMAL;
                        loop {
                            let now = touchpad.now();
                            let timeout = touchpad
                                .timers
                                .next_deadline()
                                .map(|deadline| Duration::from_micros(deadline.saturating_sub(now)));
                            match epoll.wait(timeout) {
                                Ok(()) => {
                                    touchpad.expire_timers(touchpad.now());
                                    if epoll.test_read(&token) {
                                        continue 'device;
                                    }
                                    continue;
                                }
                                Err(e) => {
                                    if e.kind() == ErrorKind::Interrupted {
                                        continue;
                                    }
                                    error!("{device_path}: epoll_wait: {e}");
                                    break 'device;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!("{device_path}: {e}");
                        break;
                    }
                };

                let time = event.time.tv_sec as u64 * 1_000_000 + event.time.tv_usec as u64;
                touchpad.handle_event(event.event_code, event.value, time);
            }
        });
    }
}
