const DEFAULT_RAD_TESTS: &str = "tests/jsmoo/misc/tests/GeneratedTests/z80/v1/";

use std::collections::HashMap;
use std::fmt::{Debug, UpperHex};
use std::fs::{self, File};
use std::io::prelude::*;
use std::path::PathBuf;
use std::time::SystemTime;

use clap::Parser;
use flate2::read::GzDecoder;
use serde_derive::Deserialize;
use femtos::Frequency;

use zxcore_z80::{Z80, Z80Error, Status, Flags, InterruptMode, Memory, MemoryBlock, PortMap, SpecialRegister, FLOATING_BUS};


#[derive(Parser)]
struct Args {
    /// Filter the tests by gzip file name
    filter: Option<String>,
    /// Only run the one test with the given number
    #[clap(short, long)]
    only: Option<String>,
    /// Dump the CPU state when a test fails
    #[clap(short, long)]
    debug: bool,
    /// Only print a summary for each test file
    #[clap(short, long)]
    quiet: bool,
    /// Check the F3 and F5 flags for accuracy
    #[clap(short = 'f', long)]
    check_extra_flags: bool,
    /// Check undocumented instructions
    #[clap(short = 'u', long)]
    check_undocumented: bool,
    /// Check instruction timings
    #[clap(short = 't', long)]
    check_timings: bool,
    /// Directory to the test suite to run
    #[clap(long, default_value = DEFAULT_RAD_TESTS)]
    testsuite: String,
}

fn main() {
    let args = Args::parse();
    run_all_tests(&args);
}


#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("{0}")]
    Assertion(String),
    #[error(transparent)]
    Cpu(#[from] Z80Error),
}


#[derive(Debug, Deserialize)]
struct TestState {
    pc: u16,
    sp: u16,
    a: u8,
    b: u8,
    c: u8,
    d: u8,
    e: u8,
    f: u8,
    h: u8,
    l: u8,
    i: u8,
    r: u8,
    ix: u16,
    iy: u16,
    af_: u16,
    bc_: u16,
    de_: u16,
    hl_: u16,
    im: u8,
    iff1: u8,
    iff2: u8,
    ram: Vec<(u16, u8)>,
}

#[derive(Debug, Deserialize)]
struct TestCycle(u16, Option<u8>, String);

#[derive(Debug, Deserialize)]
struct TestPort {
    addr: u16,
    value: u8,
    atype: String,
}

#[derive(Debug, Deserialize)]
struct TestCase {
    name: String,
    #[serde(rename(deserialize = "initial"))]
    initial_state: TestState,
    #[serde(rename(deserialize = "final"))]
    final_state: TestState,
    #[serde(default)]
    cycles: Vec<TestCycle>,
    #[serde(default)]
    ports: Vec<TestPort>,
}

impl TestState {
    pub fn dump(&self) {
        println!(" a: {:02x}   a': {:02x}", self.a, self.af_ >> 8);
        println!(" b: {:02x}   b': {:02x}", self.b, self.bc_ >> 8);
        println!(" c: {:02x}   c': {:02x}", self.c, self.bc_ & 0xff);
        println!(" d: {:02x}   d': {:02x}", self.d, self.de_ >> 8);
        println!(" e: {:02x}   e': {:02x}", self.e, self.de_ & 0xff);
        println!(" f: {:02x}   f': {:02x}", self.f, self.af_ & 0xff);
        println!(" h: {:02x}   h': {:02x}", self.h, self.hl_ >> 8);
        println!(" l: {:02x}   l': {:02x}", self.l, self.hl_ & 0xff);
        println!("pc: {:04x}   sp: {:04x}", self.pc, self.sp);
        println!("ix: {:04x}   iy: {:04x}", self.ix, self.iy);
        println!(" i: {:02x}    r: {:02x}", self.i, self.r);
        println!("im: {:02x} iff1: {:02x} iff2: {:02x}", self.im, self.iff1, self.iff2);

        println!("ram: ");
        for (addr, byte) in self.ram.iter() {
            println!("{:04x} {:02x} ", *addr, *byte);
        }
    }
}

impl TestCase {
    pub fn dump(&self) {
        println!("{}", self.name);
        println!("initial:");
        self.initial_state.dump();
        println!("final:");
        self.final_state.dump();

        println!("ports: ");
        for port in self.ports.iter() {
            println!("{:04x} {:02x} {}", port.addr, port.value, port.atype);
        }
    }
}


/// Serves the port reads a test case expects and records the writes the CPU makes
#[derive(Default)]
struct RecordedPorts {
    inputs: HashMap<u16, u8>,
    outputs: Vec<(u16, u8)>,
}

impl RecordedPorts {
    fn new(ports: &[TestPort]) -> Self {
        let inputs = ports
            .iter()
            .filter(|port| port.atype == "r")
            .map(|port| (port.addr, port.value))
            .collect();

        Self {
            inputs,
            outputs: vec![],
        }
    }
}

impl PortMap for RecordedPorts {
    fn read(&mut self, port: u8, upper: u8) -> u8 {
        let addr = ((upper as u16) << 8) | port as u16;
        self.inputs.get(&addr).copied().unwrap_or(FLOATING_BUS)
    }

    fn write(&mut self, port: u8, upper: u8, value: u8) {
        let addr = ((upper as u16) << 8) | port as u16;
        self.outputs.push((addr, value));
    }
}


fn init_execute_test(state: &TestState, ports: &[TestPort]) -> (Z80, MemoryBlock, RecordedPorts) {
    let mut cpu = Z80::new(Frequency::from_mhz(10));
    cpu.state.status = Status::Running;

    let mut memory = MemoryBlock::new();
    load_state(&mut cpu, &mut memory, state);

    (cpu, memory, RecordedPorts::new(ports))
}

fn assert_value<T>(actual: T, expected: T, message: &str) -> Result<(), Error>
where
    T: PartialEq + Debug + UpperHex,
{
    if actual == expected {
        Ok(())
    } else {
        Err(Error::Assertion(format!("{:#X} != {:#X}, {}", actual, expected, message)))
    }
}

fn load_state(cpu: &mut Z80, memory: &mut MemoryBlock, initial: &TestState) {
    cpu.state.main.af.set(((initial.a as u16) << 8) | initial.f as u16);
    cpu.state.main.bc.set(((initial.b as u16) << 8) | initial.c as u16);
    cpu.state.main.de.set(((initial.d as u16) << 8) | initial.e as u16);
    cpu.state.main.hl.set(((initial.h as u16) << 8) | initial.l as u16);
    cpu.state.shadow.af.set(initial.af_);
    cpu.state.shadow.bc.set(initial.bc_);
    cpu.state.shadow.de.set(initial.de_);
    cpu.state.shadow.hl.set(initial.hl_);

    cpu.state.ix.set(initial.ix);
    cpu.state.iy.set(initial.iy);
    cpu.state.sp.set(initial.sp);
    cpu.state.pc.set(initial.pc);
    cpu.state.set_special_register(SpecialRegister::I, initial.i);
    cpu.state.set_special_register(SpecialRegister::R, initial.r);
    cpu.state.interrupts.mode = initial.im.into();
    cpu.state.interrupts.iff1 = initial.iff1 != 0;
    cpu.state.interrupts.iff2 = initial.iff2 != 0;

    for (addr, byte) in initial.ram.iter() {
        memory.write_byte(*addr, *byte);
    }
}

const IGNORE_FLAG_MASK: u8 = Flags::F3 as u8 | Flags::F5 as u8;

fn assert_state(
    cpu: &Z80,
    memory: &mut MemoryBlock,
    ports: &RecordedPorts,
    expected: &TestState,
    expected_ports: &[TestPort],
    check_extra_flags: bool,
) -> Result<(), Error> {
    let main = &cpu.state.main;
    assert_value(main.af.high(), expected.a, "a")?;
    if check_extra_flags {
        assert_value(main.af.low(), expected.f, "f")?;
    } else {
        assert_value(main.af.low() & !IGNORE_FLAG_MASK, expected.f & !IGNORE_FLAG_MASK, "f")?;
    }
    assert_value(main.bc.high(), expected.b, "b")?;
    assert_value(main.bc.low(), expected.c, "c")?;
    assert_value(main.de.high(), expected.d, "d")?;
    assert_value(main.de.low(), expected.e, "e")?;
    assert_value(main.hl.high(), expected.h, "h")?;
    assert_value(main.hl.low(), expected.l, "l")?;

    let shadow = &cpu.state.shadow;
    assert_value(shadow.af.get(), expected.af_, "af'")?;
    assert_value(shadow.bc.get(), expected.bc_, "bc'")?;
    assert_value(shadow.de.get(), expected.de_, "de'")?;
    assert_value(shadow.hl.get(), expected.hl_, "hl'")?;

    assert_value(cpu.state.ix.get(), expected.ix, "ix")?;
    assert_value(cpu.state.iy.get(), expected.iy, "iy")?;
    assert_value(cpu.state.sp.get(), expected.sp, "sp")?;
    assert_value(cpu.state.pc.get(), expected.pc, "pc")?;
    assert_value(cpu.state.ir.high(), expected.i, "i")?;
    assert_value(cpu.state.ir.low(), expected.r, "r")?;

    let expected_im: InterruptMode = expected.im.into();
    if cpu.state.interrupts.mode != expected_im {
        return Err(Error::Assertion(format!("{:?} != {:?}, im", cpu.state.interrupts.mode, expected_im)));
    }
    assert_value(cpu.state.interrupts.iff1 as u8, expected.iff1, "iff1")?;
    assert_value(cpu.state.interrupts.iff2 as u8, expected.iff2, "iff2")?;

    for (addr, byte) in expected.ram.iter() {
        let actual = memory.read_byte(*addr);
        assert_value(actual, *byte, &format!("ram at {:x}", addr))?;
    }

    let expected_writes: Vec<(u16, u8)> = expected_ports
        .iter()
        .filter(|port| port.atype == "w")
        .map(|port| (port.addr, port.value))
        .collect();
    if ports.outputs != expected_writes {
        return Err(Error::Assertion(format!("port writes {:x?} != {:x?}", ports.outputs, expected_writes)));
    }

    Ok(())
}

fn step_cpu_and_assert(
    cpu: &mut Z80,
    memory: &mut MemoryBlock,
    ports: &mut RecordedPorts,
    case: &TestCase,
    args: &Args,
) -> Result<(), Error> {
    let clocks = cpu.step(memory, ports)?;

    assert_state(cpu, memory, ports, &case.final_state, &case.ports, args.check_extra_flags)?;
    if args.check_timings && clocks as usize != case.cycles.len() {
        return Err(Error::Assertion(format!(
            "expected instruction to take {} cycles, but took {}",
            case.cycles.len(),
            clocks
        )));
    }

    Ok(())
}

fn run_test(case: &TestCase, args: &Args) -> Result<(), Error> {
    let (mut cpu, mut memory, mut ports) = init_execute_test(&case.initial_state, &case.ports);
    let initial_cpu = cpu.clone();

    let result = step_cpu_and_assert(&mut cpu, &mut memory, &mut ports, case, args);

    if let Err(err) = &result {
        if !args.quiet && args.debug {
            case.dump();
            println!();

            let mut output = String::new();
            for state in [&initial_cpu, &cpu] {
                // the instruction bytes are in memory for both dumps since execution leaves them alone
                if state.dump_state(&mut output, &mut memory).is_err() {
                    output.push_str("<state dump failed>\n");
                }
                output.push('\n');
            }
            println!("{}", output);
            println!("FAILED: {}", err);
        }
    }
    result
}

fn test_json_file(path: PathBuf, args: &Args) -> (usize, usize, String) {
    let extension = path.extension().unwrap();

    let cases: Vec<TestCase> = if extension == "gz" {
        let file = File::open(&path).unwrap();
        let mut decoder = GzDecoder::new(file);
        let mut data = String::new();
        decoder.read_to_string(&mut data).unwrap();
        serde_json::from_str(&data).unwrap()
    } else {
        let data = fs::read(&path).unwrap();
        serde_json::from_slice(&data).unwrap()
    };

    let mut passed = 0;
    let mut failed = 0;
    for mut case in cases {
        if let Some(only) = args.only.as_ref() {
            if !case.name.ends_with(only) {
                continue;
            }
        }

        // Sort the ram memory for debugging help
        if args.debug {
            case.initial_state.ram.sort_by_key(|(addr, _)| *addr);
            case.final_state.ram.sort_by_key(|(addr, _)| *addr);
        }

        if !args.quiet {
            println!("Running test {}", case.name);
        }
        let result = run_test(&case, args);

        if let Err(err) = result {
            failed += 1;
            if !args.quiet {
                println!("FAILED: {}", err);
            }
        } else {
            passed += 1
        }
    }

    let name = path.file_name().unwrap().to_str().unwrap();
    let message = if failed == 0 {
        format!("{} completed, all passed!", name)
    } else {
        format!("{} completed: {} passed, {} FAILED", name, passed, failed)
    };

    (passed, failed, message)
}


fn run_all_tests(args: &Args) {
    let mut passed = 0;
    let mut failed = 0;
    let mut messages = vec![];

    let mut tests: Vec<PathBuf> = fs::read_dir(&args.testsuite)
        .unwrap()
        .map(|dirent| dirent.unwrap().path())
        .collect();
    tests.sort();

    let start = SystemTime::now();
    for path in tests {
        // Only test json files (the repo has .md files as well)
        let extension = match path.extension() {
            Some(extension) => extension,
            None => continue,
        };
        if extension != "json" && extension != "gz" {
            continue;
        }

        let name = path.file_name().unwrap().to_str().unwrap();

        // If specified, only test files that start with a given string
        if let Some(filter) = &args.filter {
            if !name.starts_with(filter) {
                continue;
            }
        }

        if !args.check_undocumented && is_undocumented_instruction(name) {
            continue;
        }

        let (test_passed, test_failed, message) = test_json_file(path, args);

        // In quiet mode, print each summary as it's received to give a progress update
        if args.quiet {
            println!("{}", message);
        }

        passed += test_passed;
        failed += test_failed;
        messages.push(message);
    }
    let elapsed_secs = start.elapsed().unwrap().as_secs();

    if !args.quiet {
        for message in messages {
            println!("{}", message);
        }
    }

    println!();
    println!(
        "passed: {}, failed: {}, total {:.0}%",
        passed,
        failed,
        ((passed as f32) / (passed as f32 + failed as f32)) * 100.0
    );
    println!("completed in {}m {}s", elapsed_secs / 60, elapsed_secs % 60);
}

fn is_undocumented_instruction(name: &str) -> bool {
    let mut opcodes: Vec<u8> = name
        .splitn(3, &[' ', '.'])
        .filter_map(|s| u8::from_str_radix(s, 16).ok())
        .collect();
    opcodes.resize(3, 0);

    match (opcodes[0], opcodes[1]) {
        // SLL
        (0xCB, op) => (0x30..=0x37).contains(&op),
        // anything but the plain (IX+d) forms copies its result into a register
        (0xDD, 0xCB) | (0xFD, 0xCB) => opcodes[2] & 0x07 != 0x06,
        (0xDD, op) | (0xFD, op) => uses_index_half(op),
        (0xED, op) => op == 0x70 || op == 0x71 || is_ed_mirror(op),
        _ => false,
    }
}

/// The DD/FD opcodes that name IXH, IXL, IYH or IYL
fn uses_index_half(op: u8) -> bool {
    match op {
        0x24 | 0x25 | 0x26 | 0x2C | 0x2D | 0x2E => true,
        0x40..=0x7F => {
            let dest = (op >> 3) & 0x07;
            let src = op & 0x07;
            // the (IX+d) forms swap in H and L unchanged
            op != 0x76 && dest != 6 && src != 6 && (dest == 4 || dest == 5 || src == 4 || src == 5)
        },
        0x80..=0xBF => {
            let src = op & 0x07;
            src == 4 || src == 5
        },
        _ => false,
    }
}

/// The ED opcodes that repeat NEG, RETN and IM in the undocumented slots
fn is_ed_mirror(op: u8) -> bool {
    match op {
        0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => true,
        0x55 | 0x5D | 0x65 | 0x6D | 0x75 | 0x7D => true,
        0x4E | 0x66 | 0x6E | 0x76 | 0x7E => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_errors_pass_through() {
        let err: Error = Z80Error::Breakpoint(0x1234).into();
        assert_eq!(err.to_string(), Z80Error::Breakpoint(0x1234).to_string());
        assert_eq!(Error::Assertion("0x1 != 0x2, a".to_string()).to_string(), "0x1 != 0x2, a");
    }

    #[test]
    fn undocumented_files_are_recognised() {
        assert!(is_undocumented_instruction("cb 30.json"));
        assert!(is_undocumented_instruction("dd 44.json"));
        assert!(!is_undocumented_instruction("dd 46.json"));
        assert!(!is_undocumented_instruction("ed b3.json"));
    }
}
