//! Doorcom command line interface.

use std::{process, time::Duration};

use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_t, App, AppSettings::*, Arg,
    ArgMatches, SubCommand,
};
use console::style;
use log::{debug, error, trace, warn, LevelFilter};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use simplelog::*;

use doorcom::{
    self as dc, console as term, control, hmi,
    link::{select_port, PortLink},
    peripherals::CredentialStore,
    protocol::Credential,
    sim::Simulation,
    store::{FileStore, MemoryStore},
};

fn main() {
    println!("[DC] doorcom v{}", crate_version!());

    if let Err(e) = ctrlc::set_handler(move || {
        println!("🛑 received Ctrl+C!");
        process::exit(0);
    }) {
        println!("{}: no Ctrl+C handler: {}", style("warning").yellow(), e);
    }

    let matches = App::new(crate_name!())
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "\n\
            Doorcom runs one node of a two-node door lock. The HMI node owns \
            the keypad and the display; the control node owns the password \
            store, the door motor, the alarm and the doorway motion sensor. \
            The nodes talk over a serial line.\n\
            \n\
            Run `doorcom control` on the machine wired to the door and \
            `doorcom hmi` on the one the user types on. On a single machine, \
            a virtual serial pair (e.g. socat) works as well.\n\
            \n\
            `doorcom simulate` runs both nodes in one process on virtual \
            hardware and prints everything that happened, in order.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .setting(SubcommandRequiredElseHelp)
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .subcommand(
            SubCommand::with_name("control")
                .about("runs the control node: password store, door and alarm")
                .args(&serial_args())
                .arg(
                    Arg::with_name("STORE")
                        .help("file emulating the password EEPROM")
                        .long_help(
                            "file emulating the password EEPROM; created on \
                             first save. When not set, the password is only \
                             kept in memory.",
                        )
                        .long("--store")
                        .takes_value(true)
                        .require_equals(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("hmi")
                .about("runs the HMI node on this terminal: keypad and display")
                .args(&serial_args()),
        )
        .subcommand(
            SubCommand::with_name("simulate")
                .about("runs both nodes on virtual hardware")
                .arg(
                    Arg::with_name("STORED")
                        .help("password already provisioned, e.g. 12345")
                        .long("--stored")
                        .takes_value(true)
                        .require_equals(true),
                )
                .arg(
                    Arg::with_name("TICK_MS")
                        .help("length of one simulated second, in milliseconds")
                        .long("--tick-ms")
                        .takes_value(true)
                        .default_value("10")
                        .require_equals(true),
                )
                .arg(
                    Arg::with_name("KEYS")
                        .help("key presses: digits, `+`, `-`, and `e` for Enter")
                        .long_help(
                            "key presses: digits, `+`, `-`, and `e` for Enter. \
                             Spaces are ignored. The simulation ends when the \
                             keys run out.",
                        )
                        .required(true)
                        .index(1),
                ),
        )
        .get_matches();

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'doorcom -v -v -v' or 'doorcom -vvv' vs 'doorcom -v'
    let log_level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    if let Err(e) = TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        println!("{}: no logger: {}", style("warning").yellow(), e);
    }

    trace!("{:#?}", matches);

    let exit_code = match matches.subcommand() {
        ("control", Some(sub)) => run_control(sub),
        ("hmi", Some(sub)) => run_hmi(sub),
        ("simulate", Some(sub)) => run_simulation(sub),
        _ => unreachable!(),
    };
    debug!("exit code: {}", exit_code);
    std::process::exit(exit_code.into());
}

// =============================================================================
// Commands
// =============================================================================

fn run_control(matches: &ArgMatches) -> i8 {
    let mut settings = serial_settings(matches);
    if let Some(store_path) = matches.value_of("STORE") {
        settings.store_path = Some(store_path.into());
    }

    let store: Box<dyn CredentialStore> = match &settings.store_path {
        Some(path) => match FileStore::open(path) {
            Ok(store) => Box::new(store),
            Err(e) => fail("store", e),
        },
        None => {
            warn!("no --store given, the password will not survive a restart");
            Box::new(MemoryStore::new())
        }
    };

    let link = open_link(&mut settings);
    let peripherals = control::Peripherals {
        link: Box::new(link),
        store,
        motor: Box::new(term::ConsoleMotor::default()),
        alarm: Box::new(term::ConsoleAlarm::default()),
        motion: Box::new(term::PromptMotionSensor::default()),
    };
    control::factory(settings, peripherals).run()
}

fn run_hmi(matches: &ArgMatches) -> i8 {
    let mut settings = serial_settings(matches);
    let link = open_link(&mut settings);
    let peripherals = hmi::Peripherals {
        link: Box::new(link),
        keypad: Box::new(term::TerminalKeypad::default()),
        display: Box::new(term::ConsoleDisplay::default()),
    };
    hmi::factory(settings, peripherals).run()
}

fn run_simulation(matches: &ArgMatches) -> i8 {
    let tick_ms = value_t!(matches.value_of("TICK_MS"), u64)
        .unwrap_or_else(|_| invalid_value("tick-ms", matches.value_of("TICK_MS")));
    let settings = dc::SettingsBuilder::new()
        .tick_period(Duration::from_millis(tick_ms))
        .finalize();

    let mut simulation = Simulation::new(settings);
    if let Some(stored) = matches.value_of("STORED") {
        match stored.parse::<Credential>() {
            Ok(credential) => simulation = simulation.stored(&credential),
            Err(e) => fail("stored", e),
        }
    }
    let keys = matches.value_of("KEYS").unwrap_or_default();
    let outcome = simulation.keys(keys).run();

    for (index, record) in outcome.journal.records().iter().enumerate() {
        println!("{:>4} {}", style(index).dim(), record);
    }
    println!(
        "[DC] stored record: {}",
        style(format!("{:02x?}", outcome.store.snapshot())).cyan()
    );
    println!(
        "[DC] hmi exited with {}, control exited with {}",
        outcome.hmi_status, outcome.control_status
    );
    if outcome.hmi_status == 0 && outcome.control_status == 0 {
        0
    } else {
        1
    }
}

// =============================================================================
// Serial port arguments
// =============================================================================

fn serial_args() -> Vec<Arg<'static, 'static>> {
    vec![
        Arg::with_name("DEVICE_TTY")
            .help("the tty device wired to the other node")
            .long_help(
                "the tty device wired to the other node; when not set, \
                 `doorcom` lists the serial ports it finds and lets you \
                 pick one.",
            )
            .short("t")
            .long("--tty")
            .takes_value(true)
            .require_equals(true),
        Arg::with_name("BAUD_RATE")
            .help("serial port baud rate")
            .short("b")
            .long("--baud-rate")
            .takes_value(true)
            .default_value("4800")
            .require_equals(true),
        Arg::with_name("DATA_BITS")
            .help("number of bits per character")
            .short("d")
            .long("--data-bits")
            .takes_value(true)
            .possible_values(&["5", "6", "7", "8"])
            .default_value("8")
            .require_equals(true),
        Arg::with_name("STOP_BITS")
            .help("number of stop bits per byte")
            .short("s")
            .long("--stop-bits")
            .takes_value(true)
            .possible_values(&["1", "2"])
            .default_value("1")
            .require_equals(true),
        Arg::with_name("PARITY")
            .help("parity checking protocol")
            .short("p")
            .long("--parity")
            .takes_value(true)
            .possible_values(&["none", "odd", "even"])
            .default_value("none")
            .require_equals(true),
        Arg::with_name("FLOW_CONTROL")
            .help("flow control mode")
            .short("f")
            .long("--flow-control")
            .takes_value(true)
            .possible_values(&["none", "soft", "hard"])
            .default_value("none")
            .require_equals(true),
        Arg::with_name("TIMEOUT_MS")
            .help("give up on a silent peer after this many milliseconds")
            .long_help(
                "give up on a silent peer after this many milliseconds; \
                 when not set, the node waits forever like the ECU firmware \
                 devices do.",
            )
            .long("--timeout-ms")
            .takes_value(true)
            .require_equals(true),
    ]
}

fn serial_settings(matches: &ArgMatches) -> dc::Settings {
    // Arguments with default values ===========================================

    let baud_rate = value_t!(matches.value_of("BAUD_RATE"), u32)
        .unwrap_or_else(|_| invalid_value("baud-rate", matches.value_of("BAUD_RATE")));

    let data_bits = match matches.value_of("DATA_BITS") {
        Some("5") => DataBits::Five,
        Some("6") => DataBits::Six,
        Some("7") => DataBits::Seven,
        _ => DataBits::Eight,
    };

    let stop_bits = match matches.value_of("STOP_BITS") {
        Some("2") => StopBits::Two,
        _ => StopBits::One,
    };

    let parity = match matches.value_of("PARITY") {
        Some("even") => Parity::Even,
        Some("odd") => Parity::Odd,
        _ => Parity::None,
    };

    let flow_control = match matches.value_of("FLOW_CONTROL") {
        Some("soft") => FlowControl::Software,
        Some("hard") => FlowControl::Hardware,
        _ => FlowControl::None,
    };

    let mut builder = dc::SettingsBuilder::default()
        .baud_rate(baud_rate)
        .data_bits(data_bits)
        .stop_bits(stop_bits)
        .parity(parity)
        .flow_control(flow_control);

    // Arguments with NO default values ========================================

    if let Some(path) = matches.value_of("DEVICE_TTY") {
        builder = builder.path(path);
    }

    if matches.is_present("TIMEOUT_MS") {
        let timeout_ms = value_t!(matches.value_of("TIMEOUT_MS"), u64)
            .unwrap_or_else(|_| invalid_value("timeout-ms", matches.value_of("TIMEOUT_MS")));
        builder = builder.receive_timeout(Duration::from_millis(timeout_ms));
    }

    builder.finalize()
}

/// Open the serial port, asking the user for one until a port opens.
fn open_link(settings: &mut dc::Settings) -> PortLink {
    loop {
        if settings.path.is_none() {
            settings.path = select_port();
            continue;
        }
        match PortLink::open(settings) {
            Ok(link) => return link,
            Err(e) => {
                error!("{}", e);
                println!(
                    "{}: could not open {}: {}",
                    style("error").red(),
                    style(settings.path.as_deref().unwrap_or_default()).cyan(),
                    e
                );
                settings.path = None;
            }
        }
    }
}

fn invalid_value(name: &str, value: Option<&str>) -> ! {
    println!(
        "{}: `{}` needs to be a numeric value",
        style("error").red(),
        style(name).cyan()
    );
    println!(
        "   {} `{}` is not a valid value",
        style("-->").cyan(),
        style(value.unwrap_or_default()).on_red()
    );
    process::exit(-1);
}

fn fail(what: &str, e: impl std::fmt::Display) -> ! {
    println!("{}: {}: {}", style("error").red(), style(what).cyan(), e);
    process::exit(1);
}
