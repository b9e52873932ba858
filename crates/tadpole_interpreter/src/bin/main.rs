use log::debug;
use std::env;
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::process;
use tadpole::{Vm, VmError, VmOption};

const VERSION: &str = concat!("Tadpole ", env!("CARGO_PKG_VERSION"));
const COPYRIGHT: &str = "A tiny bytecode VM with a mark & sweep collector";

// sysexits(3)
const EX_USAGE: i32 = 64;
const EX_DATAERR: i32 = 65;
const EX_SOFTWARE: i32 = 70;
const EX_NOINPUT: i32 = 66;

fn print_usage() {
    eprintln!("usage: tadpole [options] [script]");
    eprintln!("Available options are:");
    eprintln!("  -e stat          execute string 'stat'");
    eprintln!("  -i               enter interactive mode after executing 'script'");
    eprintln!("  -v               show version information");
    eprintln!("  --dump           print the bytecode of 'script' instead of running it");
    eprintln!("  --gc-stats       print collector statistics as JSON on exit");
    eprintln!("  --config file    load VM options from a JSON file");
    eprintln!("  --               stop handling options");
    eprintln!("  -                stop handling options and execute stdin");
}

fn print_version() {
    println!("{}", VERSION);
    println!("{}", COPYRIGHT);
}

#[derive(Default)]
struct Options {
    execute_strings: Vec<String>,
    interactive: bool,
    script_file: Option<String>,
    show_version: bool,
    read_stdin: bool,
    dump: bool,
    gc_stats: bool,
    config_file: Option<String>,
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut opts = Options::default();
    let mut i = 1;
    let mut stop_options = false;

    while i < args.len() {
        let arg = &args[i];

        if !stop_options && arg.starts_with('-') {
            match arg.as_str() {
                "-e" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("'-e' needs argument".to_string());
                    }
                    opts.execute_strings.push(args[i].clone());
                }
                "-i" => {
                    opts.interactive = true;
                }
                "-v" => {
                    opts.show_version = true;
                }
                "--dump" => {
                    opts.dump = true;
                }
                "--gc-stats" => {
                    opts.gc_stats = true;
                }
                "--config" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("'--config' needs argument".to_string());
                    }
                    opts.config_file = Some(args[i].clone());
                }
                "--" => {
                    stop_options = true;
                }
                "-" => {
                    opts.read_stdin = true;
                    stop_options = true;
                }
                _ => {
                    return Err(format!("unrecognized option '{}'", arg));
                }
            }
        } else {
            if opts.script_file.is_some() {
                return Err(format!("unexpected argument '{}'", arg));
            }
            opts.script_file = Some(arg.clone());
        }
        i += 1;
    }

    Ok(opts)
}

fn load_config(path: &str) -> Result<VmOption, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("cannot open {}: {}", path, e))?;
    serde_json::from_str(&text).map_err(|e| format!("{}: invalid config: {}", path, e))
}

/// Failure of one unit of source, with the exit status it maps to
struct Failure {
    message: String,
    status: i32,
}

impl Failure {
    fn from_vm(name: &str, error: VmError) -> Self {
        let status = if error.is_compile_error() {
            EX_DATAERR
        } else {
            EX_SOFTWARE
        };
        Failure {
            message: format!("{}: {}", name, error.report()),
            status,
        }
    }
}

fn execute_source(vm: &mut Vm, name: &str, source: &str, dump: bool) -> Result<(), Failure> {
    if dump {
        let function = vm
            .compile(source)
            .map_err(|e| Failure::from_vm(name, VmError::Compile(e)))?;
        print!("{}", vm.disassemble(function));
        return Ok(());
    }

    vm.interpret(source)
        .map(|_| ())
        .map_err(|e| Failure::from_vm(name, e))
}

fn read_file(filename: &str) -> Result<String, Failure> {
    fs::read_to_string(filename).map_err(|e| Failure {
        message: format!("cannot open {}: {}", filename, e),
        status: EX_NOINPUT,
    })
}

fn read_stdin() -> Result<String, Failure> {
    let mut code = String::new();
    io::stdin().read_to_string(&mut code).map_err(|e| Failure {
        message: format!("error reading stdin: {}", e),
        status: EX_NOINPUT,
    })?;
    Ok(code)
}

fn run_repl(vm: &mut Vm) {
    print_version();
    println!("Type help() for the builtins, exit() or Ctrl+D to exit\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(_)) | None => break,
        };

        if line.trim().is_empty() {
            continue;
        }

        match vm.interpret(&line) {
            Ok(value) if !value.is_nil() => println!("{}", vm.stringify(value)),
            Ok(_) => {}
            Err(e) => eprintln!("{}", e.report()),
        }
        if vm.exit_requested() {
            break;
        }
    }
}

fn main() {
    env_logger::init();
    process::exit(tadpole_main());
}

fn tadpole_main() -> i32 {
    let opts = match parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("tadpole: {}", e);
            print_usage();
            return EX_USAGE;
        }
    };

    if opts.show_version {
        print_version();
        if opts.execute_strings.is_empty() && opts.script_file.is_none() && !opts.read_stdin {
            return 0;
        }
    }

    let option = match &opts.config_file {
        Some(path) => match load_config(path) {
            Ok(option) => option,
            Err(e) => {
                eprintln!("tadpole: {}", e);
                return EX_USAGE;
            }
        },
        None => VmOption::default(),
    };
    debug!("vm options: {:?}", option);

    let mut vm = Vm::new(option);
    vm.open_libs();

    let status = run(&mut vm, &opts);

    if opts.gc_stats {
        match serde_json::to_string_pretty(&vm.gc_stats()) {
            Ok(json) => eprintln!("{}", json),
            Err(e) => eprintln!("tadpole: cannot encode gc stats: {}", e),
        }
    }
    status
}

fn run(vm: &mut Vm, opts: &Options) -> i32 {
    let mut units: Vec<(String, Result<String, Failure>)> = opts
        .execute_strings
        .iter()
        .map(|code| ("(command line)".to_string(), Ok(code.clone())))
        .collect();
    if let Some(file) = &opts.script_file {
        units.push((file.clone(), read_file(file)));
    }
    if opts.read_stdin {
        units.push(("stdin".to_string(), read_stdin()));
    }

    for (name, source) in units {
        let result = source.and_then(|code| execute_source(vm, &name, &code, opts.dump));
        if let Err(failure) = result {
            eprintln!("tadpole: {}", failure.message);
            return failure.status;
        }
        if vm.exit_requested() {
            return 0;
        }
    }

    let ran_something =
        !opts.execute_strings.is_empty() || opts.script_file.is_some() || opts.read_stdin;
    if opts.interactive || (!ran_something && !opts.show_version && !opts.dump) {
        run_repl(vm);
    }
    0
}
