mod alert;
mod app;
mod battery;
mod error;
mod milestone;
mod monitor;
mod notify;
mod platform;
mod profile;
mod sound;
mod state;
mod tier;
mod timer;
#[cfg(feature = "tray")]
mod tray;
mod wake;

use std::io::{BufRead, Read};
use std::time::{Duration, Instant};

use chrono::Utc;
use crossbeam_channel::{Sender, after, select, unbounded};
use tracing::{debug, info, trace, warn};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::platform::PlatformInfo;
use crate::state::TrayState;

/// Commands typed on stdin in headless mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleCommand {
    Status,
    ToggleNotifications,
    Reload,
    ShowProfile,
    Quit,
}

impl ConsoleCommand {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "s" | "status" => Some(Self::Status),
            "n" | "notifications" => Some(Self::ToggleNotifications),
            "r" | "reload" => Some(Self::Reload),
            "p" | "profile" => Some(Self::ShowProfile),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

fn main() {
    // Init tracing to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut headless = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("battmon-tray {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            "--headless" => headless = true,
            "--parse" => {
                print_parsed(std::io::stdin().lock());
                return;
            }
            other => warn!(arg = other, "ignoring unknown argument"),
        }
    }

    info!("battmon-tray starting");
    let platform = PlatformInfo::detect();
    let app = App::new(platform);

    #[cfg(feature = "tray")]
    if !headless {
        run_tray(app);
        return;
    }
    #[cfg(not(feature = "tray"))]
    if !headless {
        info!("built without the tray feature, running headless");
    }

    run_headless(app);
}

/// Normalize raw battery command output, e.g. `acpi -b | battmon-tray --parse`.
fn print_parsed(mut input: impl Read) {
    let mut raw = String::new();
    if let Err(e) = input.read_to_string(&mut raw) {
        warn!(error = %e, "could not read stdin");
    }
    println!("{}", parsed_status(&raw));
}

fn parsed_status(raw: &str) -> String {
    let mut view = TrayState::new(false);
    view.set_reading(battery::normalize(raw), Utc::now());
    format!("{}\n{}", view.status_text(), view.time_text())
}

/// Console front-end: polls on the same timers as the tray and reads
/// commands from stdin. Runs until `q` or a signal; a closed stdin only
/// stops the command reader.
fn run_headless(mut app: App) {
    let (cmd_tx, cmd_rx) = unbounded::<ConsoleCommand>();
    // Kept alive so the channel stays open once the reader has ended.
    let _cmd_tx = cmd_tx.clone();
    let reader = std::thread::Builder::new()
        .name("battmon-stdin".into())
        .spawn(move || forward_commands(std::io::stdin().lock(), &cmd_tx));
    if let Err(e) = reader {
        warn!(error = %e, "could not read stdin, use Ctrl-C to stop");
    }

    loop {
        let wait = app
            .next_deadline()
            .map(|d| d.saturating_duration_since(Instant::now()))
            .unwrap_or(app::POLL_INTERVAL);

        select! {
            recv(cmd_rx) -> cmd => match cmd {
                Ok(ConsoleCommand::Status) => {
                    println!("{}", app.view().tooltip());
                    println!("{}", app.view().last_alert_text(Utc::now()));
                    println!("{}", app.monitor().summary());
                }
                Ok(ConsoleCommand::ToggleNotifications) => {
                    let enabled = !app.profile().notifications_enabled;
                    app.set_notifications_enabled(enabled);
                    println!("Notifications {}", if enabled { "on" } else { "off" });
                }
                Ok(ConsoleCommand::Reload) => app.reload_profile(),
                Ok(ConsoleCommand::ShowProfile) => match app.ensure_profile_file() {
                    Ok(path) => println!("{}", path.display()),
                    Err(e) => warn!(error = %e, "failed to write profile"),
                },
                Ok(ConsoleCommand::Quit) | Err(_) => {
                    info!("quit requested");
                    break;
                }
            },
            recv(after(wait.max(Duration::from_millis(1)))) -> _ => {}
        }

        let refresh = app.on_timers(Instant::now());
        if refresh.status || refresh.icon {
            trace!(
                status = refresh.status,
                icon = refresh.icon,
                opacity = app.icon_opacity(),
                "view changed"
            );
        }
    }

    app.shutdown();
}

/// Forward console commands until `q`, EOF, or the receiver goes away.
/// EOF is not a quit: daemons and autostart entries run with stdin closed.
fn forward_commands(input: impl BufRead, tx: &Sender<ConsoleCommand>) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        match ConsoleCommand::parse(&line) {
            Some(cmd) => {
                let quit = cmd == ConsoleCommand::Quit;
                if tx.send(cmd).is_err() || quit {
                    return;
                }
            }
            None if line.trim().is_empty() => {}
            None => eprintln!("commands: s(tatus), n(otifications), r(eload), p(rofile), q(uit)"),
        }
    }
    debug!("stdin closed, running until q or a signal");
}

#[cfg(feature = "tray")]
enum UserEvent {
    TrayIconEvent(tray_icon::TrayIconEvent),
    MenuEvent(tray_icon::menu::MenuEvent),
}

#[cfg(feature = "tray")]
fn run_tray(mut app: App) {
    use tao::{
        event::{Event, StartCause},
        event_loop::{ControlFlow, EventLoopBuilder},
    };
    use tray_icon::{TrayIcon, TrayIconEvent, menu::MenuEvent};

    // Build the event loop
    let mut event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();

    // Suppress dock icon on macOS, must be set before run()
    #[cfg(target_os = "macos")]
    {
        use tao::platform::macos::{ActivationPolicy, EventLoopExtMacOS};
        event_loop.set_activation_policy(ActivationPolicy::Accessory);
    }

    // Set up event handlers that forward to the event loop
    let proxy = event_loop.create_proxy();
    TrayIconEvent::set_event_handler(Some(move |event| {
        let _ = proxy.send_event(UserEvent::TrayIconEvent(event));
    }));

    let proxy = event_loop.create_proxy();
    MenuEvent::set_event_handler(Some(move |event| {
        let _ = proxy.send_event(UserEvent::MenuEvent(event));
    }));

    let (menu, menu_items) = tray::build_menu(app.view(), Utc::now());
    let os = platform::Os::current();

    // The tray icon must be created inside the event loop (after Init)
    let mut tray_icon: Option<TrayIcon> = None;

    event_loop.run(move |event, _target, control_flow| {
        let mut quit = false;

        match event {
            Event::NewEvents(StartCause::Init) => {
                let icon = tray::battery_icon(app.view(), app.icon_opacity());
                match tray::build_tray(menu.clone(), icon, app.view()) {
                    Ok(ti) => {
                        tray_icon = Some(ti);
                        info!("tray icon created");
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to create tray icon");
                        quit = true;
                    }
                }

                // Wake up the run loop on macOS so the icon appears
                #[cfg(target_os = "macos")]
                if let Some(rl) = objc2_core_foundation::CFRunLoop::main() {
                    rl.wake_up();
                }
            }

            Event::NewEvents(_) => {
                let refresh = app.on_timers(Instant::now());
                if refresh.status {
                    tray::refresh_menu(&menu_items, app.view(), Utc::now());
                    if let Some(ref ti) = tray_icon {
                        tray::refresh_tray(ti, app.view());
                    }
                }
                if refresh.icon {
                    if let Some(ref ti) = tray_icon {
                        tray::update_icon(ti, app.view(), app.icon_opacity());
                    }
                }
            }

            Event::UserEvent(UserEvent::MenuEvent(event)) => {
                if event.id == menu_items.quit_item.id() {
                    info!("quit requested");
                    quit = true;
                } else if event.id == menu_items.notifications_item.id() {
                    app.set_notifications_enabled(menu_items.notifications_item.is_checked());
                } else if event.id == menu_items.edit_item.id() {
                    match app.ensure_profile_file() {
                        Ok(path) => {
                            if let Err(e) = tray::open_file(os, path) {
                                warn!(path = %path.display(), error = %e, "failed to open profile");
                            }
                        }
                        Err(e) => warn!(error = %e, "failed to write profile"),
                    }
                } else if event.id == menu_items.reload_item.id() {
                    app.reload_profile();
                    tray::refresh_menu(&menu_items, app.view(), Utc::now());
                }
            }

            Event::UserEvent(UserEvent::TrayIconEvent(_event)) => {
                // The menu opens on left click; nothing else to do.
            }

            _ => {}
        }

        if quit {
            app.shutdown();
            tray_icon.take();
            *control_flow = ControlFlow::Exit;
        } else {
            *control_flow = match app.next_deadline() {
                Some(deadline) => ControlFlow::WaitUntil(deadline),
                None => ControlFlow::Wait,
            };
        }
    });
}
