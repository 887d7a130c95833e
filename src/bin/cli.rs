//! Secretcom command line interface.

use std::{process, time::Duration};

use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_t, App, AppSettings::*, Arg,
};
use console::style;
use log::{debug, trace, LevelFilter};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use simplelog::*;

use secretcom::{self as sc, Provisioner, SerialLine, Settings};

fn main() {
    println!("[SC] secretcom v{}", crate_version!());

    ctrlc::set_handler(move || {
        println!("🛑 received Ctrl+C!");
        process::exit(130);
    })
    .expect("Failed to install my Ctrl-C handler!");

    let matches = App::new(crate_name!())
        .version(format!("v{}", crate_version!()).as_str())
        .author(crate_authors!())
        .about(crate_description!())
        .long_about(
            "\n\
            Secretcom works in tandem with the board firmware to store device \
            secrets in its non-volatile storage. It puts the board in secrets \
            mode and then, for each device listed in the secrets file, in \
            order:\n\
               \t* selects the storage slot with the device index \n\
               \t* uploads the name, MAC address, key and blob \n\
               \t* checks the CRC32 of the staged record \n\
               \t* commits the record to storage \n\
               \t* reads the CRC32 of the stored record back \n\
            \n\
            A device that fails any step is skipped and the next one is \
            processed. Every line received from the board is printed.\n\
            \n\
            The secrets file is YAML with a `devices` list; each device has a \
            `name` (up to 15 bytes), a `mac` (6 bytes), a `key` (16 bytes) \
            and a `blob` (256 bytes), binary fields written in hex or base64.\
        ",
        )
        .max_term_width(80)
        .setting(ColoredHelp)
        .setting(NextLineHelp)
        .arg(
            Arg::with_name("PORT")
                .help("the serial port device to use (e.g. /dev/ttyUSB0)")
                .short("-p")
                .long("--port")
                .takes_value(true)
                .required(true)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("SECRETS_FILE")
                .help("path to the YAML secrets file")
                .short("-f")
                .long("--file")
                .takes_value(true)
                .required(true)
                .require_equals(true),
        )
        .arg(
            Arg::with_name("BAUD_RATE")
                .help("serial port baud rate")
                .short("-b")
                .long("--baud-rate")
                .takes_value(true)
                .default_value("115200")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("TIMEOUT")
                .help("read timeout, in seconds")
                .long_help(
                    "how long to wait for a line from the board, in seconds; \
                     a command not answered in time fails and the device being \
                     provisioned is skipped.",
                )
                .short("-t")
                .long("--timeout")
                .takes_value(true)
                .default_value("2")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("DATA_BITS")
                .help("number of bits per character")
                .long("--data-bits")
                .takes_value(true)
                .possible_values(&["5", "6", "7", "8"])
                .default_value("8")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("STOP_BITS")
                .help("number of stop bits per byte")
                .long("--stop-bits")
                .takes_value(true)
                .possible_values(&["1", "2"])
                .default_value("1")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("PARITY")
                .help("parity checking protocol")
                .long("--parity")
                .takes_value(true)
                .possible_values(&["none", "odd", "even"])
                .default_value("none")
                .require_equals(true),
        )
        .arg(
            Arg::with_name("FLOW_CONTROL")
                .help("flow control mode")
                .long("--flow-control")
                .takes_value(true)
                .possible_values(&["none", "soft", "hard"])
                .default_value("none")
                .require_equals(true),
        )
        .arg(Arg::with_name("v").short("v").multiple(true).help(
            "Sets the logging level of verbosity, repeat several times for \
                higher verbosity",
        ))
        .get_matches();

    // Vary the output based on how many times the user used the "verbose" flag
    // (i.e. 'secretcom -v -v -v' or 'secretcom -vvv' vs 'secretcom -v'
    let log_level = match matches.occurrences_of("v") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .expect("Failed to initialize the logger!");

    trace!("{:#?}", matches);

    // Arguments with default values ===========================================

    // It's safe to call unwrap on all command line arguments with default
    // values, because the value with either be what the user input at runtime
    // or the default value

    let baud_rate = value_t!(matches.value_of("BAUD_RATE"), u32)
        .unwrap_or_else(|_| numeric_error("baud-rate", matches.value_of("BAUD_RATE")));

    let timeout = value_t!(matches.value_of("TIMEOUT"), u64)
        .unwrap_or_else(|_| numeric_error("timeout", matches.value_of("TIMEOUT")));

    let data_bits = match matches.value_of("DATA_BITS").unwrap() {
        "5" => DataBits::Five,
        "6" => DataBits::Six,
        "7" => DataBits::Seven,
        "8" => DataBits::Eight,
        _ => unreachable!(),
    };

    let stop_bits = match matches.value_of("STOP_BITS").unwrap() {
        "1" => StopBits::One,
        "2" => StopBits::Two,
        _ => unreachable!(),
    };

    let parity = match matches.value_of("PARITY").unwrap() {
        "none" => Parity::None,
        "even" => Parity::Even,
        "odd" => Parity::Odd,
        _ => unreachable!(),
    };

    let flow_control = match matches.value_of("FLOW_CONTROL").unwrap() {
        "none" => FlowControl::None,
        "soft" => FlowControl::Software,
        "hard" => FlowControl::Hardware,
        _ => unreachable!(),
    };

    // END - Arguments with default values =====================================

    // Required arguments are enforced by clap, which prints the usage and exits
    // when they are missing.
    let settings = sc::SettingsBuilder::new()
        .path(matches.value_of("PORT").unwrap())
        .secrets_file(matches.value_of("SECRETS_FILE").unwrap())
        .baud_rate(baud_rate)
        .timeout(Duration::from_secs(timeout))
        .data_bits(data_bits)
        .stop_bits(stop_bits)
        .parity(parity)
        .flow_control(flow_control)
        .finalize();

    // Run the session =========================================================

    // The port is owned by `run` and closed when it returns, before exiting.
    let exit_code = run(&settings);
    debug!("exit code: {}", exit_code);
    process::exit(exit_code);
}

fn run(settings: &Settings) -> i32 {
    let secrets_file = settings.secrets_file.as_deref().unwrap_or_default();

    println!("Reading input secrets file...");
    let secrets = match sc::load_secrets(secrets_file) {
        Ok(secrets) => secrets,
        Err(e) => return fatal(e),
    };
    if secrets.is_empty() {
        println!("No secrets present");
        return 0;
    }

    let port = match sc::open_port(settings) {
        Ok(port) => port,
        Err(e) => return fatal(e),
    };

    let report = Provisioner::new(SerialLine::new(port)).run(&secrets);

    println!();
    println!("{}", report);
    if report.is_success() {
        println!("{}", style("OK!").green());
    } else {
        println!(
            "{}",
            style("[SC] 💥 Some devices were not provisioned, run again for them!").red()
        );
    }
    report.exit_code()
}

fn fatal(error: sc::Error) -> i32 {
    println!("{}: {}", style("error").red(), error);
    -1
}

fn numeric_error<T>(name: &str, value: Option<&str>) -> T {
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
