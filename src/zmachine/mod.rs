//! Runtime state and execution
use std::collections::{HashSet, VecDeque};

use crate::config::Config;
use crate::error::{ErrorCode, RuntimeError};
use crate::instruction::decoder;
use crate::instruction::processor::{self, processor_var};
use crate::instruction::{NextAddress, StoreResult};
use crate::object::{self, ObjectTree};
use crate::quetzal::{IFhd, Mem, Quetzal, Stk, Stks};
use crate::{fatal_error, recoverable_error, text};

use self::frame::Frame;
use self::header::{Flags1v3, Flags1v4, Flags2, HeaderField};
use self::io::{Persistence, Screen, Sound};
use self::memory::Memory;
use self::rng::chacha_rng::ChaChaRng;
use self::rng::ZRng;

pub mod frame;
pub mod header;
pub mod io;
pub mod memory;
pub mod rng;

/// How recoverable runtime errors are handled
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorHandling {
    /// Warn the player every time
    ContinueWarnAlways,
    /// Warn the player the first time each error code occurs
    ContinueWarnOnce,
    /// Log, but don't warn the player
    Ignore,
    /// Stop the machine
    Abort,
}

/// Execution state
///
/// The runtime never blocks for input.  READ and READ_CHAR park the
/// machine in an `Awaiting` state and the embedder resumes it with
/// [ZMachine::resume_with_input] or [ZMachine::resume_with_char].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RunState {
    /// Ready to execute the next instruction
    Running,
    /// READ is waiting for a line of input
    AwaitingLine {
        /// Text buffer address
        text_buffer: usize,
        /// Parse buffer address, 0 if none
        parse_buffer: usize,
        /// Maximum input length in characters
        length: usize,
        /// Input terminator characters
        terminators: Vec<u16>,
        /// Input carried over from an earlier READ (V5+)
        preload: Vec<u16>,
    },
    /// READ_CHAR is waiting for a keypress
    AwaitingChar,
    /// The program has quit
    Stopped,
}

/// An output stream 3 redirection frame
struct Stream3 {
    address: usize,
    buffer: Vec<u16>,
}

impl Stream3 {
    fn new(address: usize) -> Stream3 {
        Stream3 {
            address,
            buffer: Vec::new(),
        }
    }

    fn address(&self) -> usize {
        self.address
    }

    fn buffer(&self) -> &Vec<u16> {
        &self.buffer
    }

    fn push(&mut self, c: u16) {
        self.buffer.push(c)
    }
}

pub struct ZMachine {
    name: String,
    version: u8,
    memory: Memory,
    objects: Box<dyn ObjectTree>,
    rng: Box<dyn ZRng>,
    frames: Vec<Frame>,
    undo_stack: VecDeque<Quetzal>,
    undo_limit: usize,
    errors: HashSet<ErrorCode>,
    error_handling: ErrorHandling,
    output_streams: u8,
    stream_3: Vec<Stream3>,
    run_state: RunState,
    instruction_count: usize,
    screen: Box<dyn Screen>,
    sound: Box<dyn Sound>,
    persistence: Box<dyn Persistence>,
}

impl std::fmt::Debug for Stream3 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stream 3 table @ {:04x}: {} characters",
            self.address,
            self.buffer.len()
        )
    }
}

impl TryFrom<(&ZMachine, usize)> for Quetzal {
    type Error = RuntimeError;

    fn try_from((value, pc): (&ZMachine, usize)) -> Result<Self, Self::Error> {
        let ifhd = IFhd::try_from((value, pc))?;
        let mem = Mem::try_from(value)?;
        let stks = Stks::try_from(value)?;

        Ok(Quetzal::new(ifhd, mem, stks))
    }
}

impl TryFrom<(&ZMachine, usize)> for IFhd {
    type Error = RuntimeError;

    fn try_from((value, pc): (&ZMachine, usize)) -> Result<Self, Self::Error> {
        let release_number = header::field_word(&value.memory, HeaderField::Release)?;
        let mut serial_number = Vec::new();
        for i in 0..6 {
            serial_number.push(value.read_byte(HeaderField::Serial as usize + i)?);
        }
        let checksum = header::field_word(&value.memory, HeaderField::Checksum)?;

        let ifhd = IFhd::new(
            release_number,
            &serial_number,
            checksum,
            (pc as u32) & 0xFFFFFF,
        );
        debug!(target: "app::state", "Derived IFhd: {}", ifhd);
        Ok(ifhd)
    }
}

impl TryFrom<&ZMachine> for Mem {
    type Error = RuntimeError;

    fn try_from(value: &ZMachine) -> Result<Self, Self::Error> {
        let compressed_memory = value.memory.compress();
        debug!(target: "app::state", "Compressed dynamic memory: {:04x} bytes", compressed_memory.len());
        Ok(Mem::new(true, compressed_memory))
    }
}

impl TryFrom<&ZMachine> for Stks {
    type Error = RuntimeError;

    fn try_from(value: &ZMachine) -> Result<Self, Self::Error> {
        let mut frames = Vec::new();
        for f in &value.frames {
            // Flags: 0b000rvvvv
            //  r = 1 if the frame routine does not store a result
            //  vvvv = the number of local variables (0 - 15)
            let flags = match f.result() {
                Some(_) => 0x00,
                None => 0x10,
            } | f.local_variables().len();

            // Arguments: 0b87654321, one bit per argument passed
            let mut arguments = 0;
            for _ in 0..f.argument_count() {
                arguments = (arguments << 1) | 0x01;
            }

            let result_variable = match f.result() {
                Some(r) => r.variable(),
                None => 0,
            };

            frames.push(Stk::new(
                f.return_address() as u32,
                flags as u8,
                result_variable,
                arguments,
                f.local_variables(),
                f.stack(),
            ));
        }

        let stks = Stks::new(frames);
        debug!(target: "app::state", "Runtime stack data: {} frames", stks.stks().len());
        Ok(stks)
    }
}

impl ZMachine {
    /// Constructor
    ///
    /// # Arguments
    /// * `zcode` - Story file image
    /// * `config` - Runtime configuration
    /// * `name` - Story file base name, used for save file naming
    /// * `screen` - Display collaborator
    /// * `sound` - Sound collaborator
    /// * `persistence` - Save file collaborator
    pub fn new(
        zcode: Vec<u8>,
        config: &Config,
        name: &str,
        screen: Box<dyn Screen>,
        sound: Box<dyn Sound>,
        persistence: Box<dyn Persistence>,
    ) -> Result<ZMachine, RuntimeError> {
        let memory = Memory::new(zcode);
        let version = header::field_byte(&memory, HeaderField::Version)?;
        if version == 6 || !(1..=8).contains(&version) {
            return fatal_error!(
                ErrorCode::UnsupportedVersion,
                "Version {} is not supported",
                version
            );
        }

        let table = header::field_word(&memory, HeaderField::ObjectTable)? as usize;
        let objects = object::new_tree(version, table);
        let mut zm = ZMachine {
            name: name.to_string(),
            version,
            memory,
            objects,
            rng: Box::<ChaChaRng>::default(),
            frames: Vec::new(),
            undo_stack: VecDeque::new(),
            undo_limit: config.undo_limit(),
            errors: HashSet::new(),
            error_handling: config.error_handling(),
            output_streams: 0x1,
            stream_3: Vec::new(),
            run_state: RunState::Running,
            instruction_count: 0,
            screen,
            sound,
            persistence,
        };

        zm.initialize()?;
        Ok(zm)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    pub fn instruction_count(&self) -> usize {
        self.instruction_count
    }

    /// Set interpreter capability flags and header fields
    ///
    /// Done on load, restart, and restore.
    fn initialize(&mut self) -> Result<(), RuntimeError> {
        let rows = self.screen.rows();
        let columns = self.screen.columns();

        if self.version < 4 {
            header::clear_flag1(&mut self.memory, Flags1v3::StatusLineNotAvailable)?;
            header::set_flag1(&mut self.memory, Flags1v3::ScreenSplitAvailable)?;
            header::clear_flag1(&mut self.memory, Flags1v3::VariablePitchDefault)?;
        }

        if self.version > 3 {
            header::set_byte(&mut self.memory, HeaderField::DefaultBackground, 2)?;
            header::set_byte(&mut self.memory, HeaderField::DefaultForeground, 9)?;
            header::set_byte(&mut self.memory, HeaderField::ScreenLines, rows as u8)?;
            header::set_byte(&mut self.memory, HeaderField::ScreenColumns, columns as u8)?;
        }

        if self.version > 4 {
            header::clear_flag1(&mut self.memory, Flags1v4::PicturesAvailable)?;
            header::set_flag1(&mut self.memory, Flags1v4::ColoursAvailable)?;
            header::set_flag1(&mut self.memory, Flags1v4::BoldfaceAvailable)?;
            header::set_flag1(&mut self.memory, Flags1v4::ItalicAvailable)?;
            header::set_flag1(&mut self.memory, Flags1v4::FixedSpaceAvailable)?;
            header::clear_flag1(&mut self.memory, Flags1v4::TimedInputAvailable)?;
            header::clear_flag2(&mut self.memory, Flags2::RequestPictures)?;
            header::clear_flag2(&mut self.memory, Flags2::RequestSoundEffects)?;

            header::set_word(&mut self.memory, HeaderField::ScreenHeight, rows)?;
            header::set_word(&mut self.memory, HeaderField::ScreenWidth, columns)?;
            header::set_byte(&mut self.memory, HeaderField::FontWidth, 1)?;
            header::set_byte(&mut self.memory, HeaderField::FontHeight, 1)?;
        }

        // Interpreter number and version
        header::set_byte(&mut self.memory, HeaderField::InterpreterNumber, 6)?;
        header::set_byte(&mut self.memory, HeaderField::InterpreterVersion, b'Z')?;

        // Z-Machine standard compliance
        header::set_word(&mut self.memory, HeaderField::Revision, 0x0100)?;

        // The object table address may have changed after a restore
        let table = header::field_word(&self.memory, HeaderField::ObjectTable)? as usize;
        self.objects = object::new_tree(self.version, table);

        // Initializing after a restore will already have stack frames,
        // so check before pushing the base frame
        if self.frames.is_empty() {
            let pc = header::field_word(&self.memory, HeaderField::InitialPC)? as usize;
            self.frames.push(Frame::new(pc, pc, &[], 0, &[], None, 0));
        }

        Ok(())
    }

    // Managed memory access: read anywhere, write only to dynamic memory
    pub fn read_byte(&self, address: usize) -> Result<u8, RuntimeError> {
        self.memory.read_byte(address)
    }

    pub fn read_word(&self, address: usize) -> Result<u16, RuntimeError> {
        self.memory.read_word(address)
    }

    pub fn write_byte(&mut self, address: usize, value: u8) -> Result<(), RuntimeError> {
        self.memory.write_byte(address, value)
    }

    pub fn write_word(&mut self, address: usize, value: u16) -> Result<(), RuntimeError> {
        self.memory.write_word(address, value)
    }

    pub fn checksum(&self) -> Result<u16, RuntimeError> {
        self.memory.checksum()
    }

    // Header
    pub fn header_byte(&self, field: HeaderField) -> Result<u8, RuntimeError> {
        header::field_byte(&self.memory, field)
    }

    pub fn header_word(&self, field: HeaderField) -> Result<u16, RuntimeError> {
        header::field_word(&self.memory, field)
    }

    /// The object tree and the memory it lives in
    pub fn objects(&self) -> (&dyn ObjectTree, &Memory) {
        (self.objects.as_ref(), &self.memory)
    }

    /// The object tree and mutable memory
    pub fn objects_mut(&mut self) -> (&dyn ObjectTree, &mut Memory) {
        (self.objects.as_ref(), &mut self.memory)
    }

    // Unmanaged memory access: string literals, routines
    pub fn string_literal(&self, address: usize) -> Result<Vec<u16>, RuntimeError> {
        let mut d = Vec::new();
        // Read until bit 15 of the word is set
        loop {
            let w = self.memory.read_word(address + (d.len() * 2))?;
            d.push(w);
            if w & 0x8000 == 0x8000 {
                return Ok(d);
            }
        }
    }

    /// The window of bytes an instruction at an address may occupy
    pub fn instruction(&self, address: usize) -> Vec<u8> {
        // An instruction may be up to 23 bytes long, excluding literal strings:
        // opcode (2), operand types (2), operands (16), store variable (1),
        // branch offset (2)
        let length = usize::min(23, self.memory.size().saturating_sub(address));
        self.memory.slice(address, length).unwrap_or_default()
    }

    fn routine_header(&self, address: usize) -> Result<(usize, Vec<u16>), RuntimeError> {
        let variable_count = self.memory.read_byte(address)? as usize;
        if variable_count > 15 {
            fatal_error!(
                ErrorCode::InvalidRoutine,
                "Routines can have at most 15 local variables: {}",
                variable_count
            )
        } else {
            let (initial_pc, local_variables) = if self.version < 5 {
                let mut l = Vec::new();
                for i in 0..variable_count {
                    l.push(self.memory.read_word(address + 1 + (i * 2))?);
                }

                (address + 1 + (variable_count * 2), l)
            } else {
                (address + 1, vec![0; variable_count])
            };

            Ok((initial_pc, local_variables))
        }
    }

    // Packed addresses
    pub fn packed_routine_address(&self, address: u16) -> Result<usize, RuntimeError> {
        match self.version {
            1 | 2 | 3 => Ok(address as usize * 2),
            4 | 5 => Ok(address as usize * 4),
            7 => Ok((address as usize * 4)
                + (self.header_word(HeaderField::RoutinesOffset)? as usize * 8)),
            8 => Ok(address as usize * 8),
            _ => fatal_error!(
                ErrorCode::UnsupportedVersion,
                "Unsupported version: {}",
                self.version
            ),
        }
    }

    pub fn packed_string_address(&self, address: u16) -> Result<usize, RuntimeError> {
        match self.version {
            1 | 2 | 3 => Ok(address as usize * 2),
            4 | 5 => Ok(address as usize * 4),
            7 => Ok((address as usize * 4)
                + (self.header_word(HeaderField::StringsOffset)? as usize * 8)),
            8 => Ok(address as usize * 8),
            _ => fatal_error!(
                ErrorCode::UnsupportedVersion,
                "Unsupported version: {}",
                self.version
            ),
        }
    }

    // Frame stack
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn current_frame(&self) -> Result<&Frame, RuntimeError> {
        if let Some(frame) = self.frames.last() {
            Ok(frame)
        } else {
            fatal_error!(ErrorCode::FrameUnderflow, "No runtime frame")
        }
    }

    fn current_frame_mut(&mut self) -> Result<&mut Frame, RuntimeError> {
        if let Some(frame) = self.frames.last_mut() {
            Ok(frame)
        } else {
            fatal_error!(ErrorCode::FrameUnderflow, "No runtime frame")
        }
    }

    /// Program counter of the current frame
    pub fn pc(&self) -> Result<usize, RuntimeError> {
        Ok(self.current_frame()?.pc())
    }

    pub fn set_pc(&mut self, pc: usize) -> Result<(), RuntimeError> {
        self.current_frame_mut()?.set_pc(pc);
        Ok(())
    }

    pub fn argument_count(&self) -> Result<u8, RuntimeError> {
        Ok(self.current_frame()?.argument_count())
    }

    // Routines
    pub fn call_routine(
        &mut self,
        address: usize,
        arguments: &[u16],
        result: Option<StoreResult>,
        return_address: usize,
    ) -> Result<NextAddress, RuntimeError> {
        // Call to address 0 returns FALSE
        if address == 0 {
            if let Some(r) = result {
                self.set_variable(r.variable(), 0)?;
            }
            Ok(NextAddress::Address(return_address))
        } else {
            let (initial_pc, local_variables) = self.routine_header(address)?;
            let frame = Frame::call_routine(
                address,
                initial_pc,
                arguments,
                local_variables,
                result,
                return_address,
            )?;
            self.frames.push(frame);

            Ok(NextAddress::Address(initial_pc))
        }
    }

    pub fn return_routine(&mut self, value: u16) -> Result<NextAddress, RuntimeError> {
        if let Some(f) = self.frames.pop() {
            debug!(target: "app::state", "Return {:04x} => {:?} to ${:06x}", value, f.result(), f.return_address());
            if self.frames.is_empty() {
                return fatal_error!(
                    ErrorCode::ReturnNoCaller,
                    "Return from routine with nowhere to return to"
                );
            }

            if let Some(r) = f.result() {
                self.set_variable(r.variable(), value)?;
            }

            self.current_frame_mut()?.set_pc(f.return_address());
            Ok(NextAddress::Address(f.return_address()))
        } else {
            fatal_error!(
                ErrorCode::ReturnNoCaller,
                "Return from routine with nowhere to return to"
            )
        }
    }

    /// Unwind the frame stack to `depth` frames, then return from the
    /// frame left on top
    pub fn throw(&mut self, depth: u16, result: u16) -> Result<NextAddress, RuntimeError> {
        if depth as usize > self.frames.len() {
            return fatal_error!(
                ErrorCode::FrameUnderflow,
                "THROW to frame {} with only {} frames",
                depth,
                self.frames.len()
            );
        }

        self.frames.truncate(depth as usize);
        self.return_routine(result)
    }

    // Variables
    fn global_variable_address(&self, variable: u8) -> Result<usize, RuntimeError> {
        let table = header::field_word(&self.memory, HeaderField::GlobalTable)? as usize;
        Ok(table + ((variable as usize - 16) * 2))
    }

    /// Variable access; reading variable 0 pops the stack
    pub fn variable(&mut self, variable: u8) -> Result<u16, RuntimeError> {
        if variable < 16 {
            self.current_frame_mut()?.local_variable(variable)
        } else {
            let address = self.global_variable_address(variable)?;
            self.read_word(address)
        }
    }

    /// Variable access; reading variable 0 leaves the stack untouched
    pub fn peek_variable(&mut self, variable: u8) -> Result<u16, RuntimeError> {
        if variable < 16 {
            self.current_frame()?.peek_local_variable(variable)
        } else {
            let address = self.global_variable_address(variable)?;
            self.read_word(address)
        }
    }

    /// Variable store; writing variable 0 pushes the stack
    pub fn set_variable(&mut self, variable: u8, value: u16) -> Result<(), RuntimeError> {
        debug!(target: "app::state", "Set variable {:02x} to {:04x}", variable, value);
        if variable < 16 {
            self.current_frame_mut()?
                .set_local_variable(variable, value)
        } else {
            let address = self.global_variable_address(variable)?;
            self.write_word(address, value)
        }
    }

    /// Variable store; writing variable 0 replaces the top of the stack
    pub fn set_variable_indirect(&mut self, variable: u8, value: u16) -> Result<(), RuntimeError> {
        debug!(target: "app::state", "Set variable indirect {:02x} to {:04x}", variable, value);
        if variable < 16 {
            self.current_frame_mut()?
                .set_local_variable_indirect(variable, value)
        } else {
            let address = self.global_variable_address(variable)?;
            self.write_word(address, value)
        }
    }

    pub fn push(&mut self, value: u16) -> Result<(), RuntimeError> {
        self.current_frame_mut()?.set_local_variable(0, value)
    }

    // RNG
    pub fn random(&mut self, range: u16) -> u16 {
        self.rng.random(range)
    }

    pub fn seed(&mut self, seed: u16) {
        self.rng.seed(seed)
    }

    pub fn predictable(&mut self, seed: u16) {
        self.rng.predictable(seed)
    }

    // Output streams
    pub fn is_stream_enabled(&self, stream: u8) -> bool {
        let mask = (1 << (stream - 1)) & 0xF;
        self.output_streams & mask == mask
    }

    fn enable_output_stream(
        &mut self,
        stream: u8,
        table: Option<usize>,
    ) -> Result<(), RuntimeError> {
        match stream {
            1 | 2 => {
                let mask = (1 << (stream - 1)) & 0xF;
                self.output_streams |= mask;
                debug!(target: "app::stream", "Enable output stream {} => {:04b}", stream, self.output_streams);
                Ok(())
            }
            3 => {
                if self.stream_3.len() >= 16 {
                    return fatal_error!(
                        ErrorCode::Stream3Table,
                        "Stream 3 nested more than 16 deep"
                    );
                }
                if let Some(address) = table {
                    self.output_streams |= 0x4;
                    self.stream_3.push(Stream3::new(address));
                    debug!(target: "app::stream", "Enable output stream 3 @ {:04x}, depth {}", address, self.stream_3.len());
                    Ok(())
                } else {
                    fatal_error!(
                        ErrorCode::Stream3Table,
                        "Stream 3 enabled without a table to write to"
                    )
                }
            }
            _ => recoverable_error!(
                ErrorCode::InvalidOutputStream,
                "Stream {} is not a valid output stream",
                stream
            ),
        }
    }

    fn disable_output_stream(&mut self, stream: u8) -> Result<(), RuntimeError> {
        let mask = (1 << (stream - 1)) & 0xF;
        debug!(target: "app::stream", "Disable output stream {} => {:04b}", stream, self.output_streams);
        match stream {
            1 | 2 => {
                self.output_streams &= !mask;
                Ok(())
            }
            3 => {
                if let Some(s) = self.stream_3.pop() {
                    // Word count, then the ZSCII bytes
                    let len = s.buffer().len();
                    self.memory.write_word(s.address(), len as u16)?;
                    for (i, c) in s.buffer().iter().enumerate() {
                        self.memory.write_byte(s.address() + 2 + i, *c as u8)?;
                    }
                    if self.stream_3.is_empty() {
                        self.output_streams &= !mask;
                    }
                }
                Ok(())
            }
            _ => recoverable_error!(
                ErrorCode::InvalidOutputStream,
                "Stream {} is not a valid output stream",
                stream
            ),
        }
    }

    /// Select (positive) or deselect (negative) an output stream
    pub fn output_stream(&mut self, stream: i16, table: Option<usize>) -> Result<(), RuntimeError> {
        match stream {
            1..=3 => {
                if stream == 2 {
                    header::set_flag2(&mut self.memory, Flags2::Transcripting)?;
                }
                self.enable_output_stream(stream as u8, table)
            }
            -3..=-1 => {
                if stream == -2 {
                    header::clear_flag2(&mut self.memory, Flags2::Transcripting)?;
                }
                self.disable_output_stream(i16::abs(stream) as u8)
            }
            _ => recoverable_error!(
                ErrorCode::InvalidOutputStream,
                "Output stream {} is not valid: [-3..3]",
                stream
            ),
        }
    }

    /// Print ZSCII text to the selected streams
    ///
    /// Stream 3 captures output exclusively when selected.
    pub fn print(&mut self, text: &[u16]) -> Result<(), RuntimeError> {
        if self.is_stream_enabled(3) {
            if let Some(s) = self.stream_3.last_mut() {
                for c in text {
                    match *c {
                        0 => {}
                        0xa => s.push(0xd),
                        _ => s.push(*c),
                    }
                }
                Ok(())
            } else {
                fatal_error!(
                    ErrorCode::Stream3Table,
                    "Stream 3 enabled, but no table to write to"
                )
            }
        } else {
            if self.is_stream_enabled(1) {
                self.screen.print(text)?;
            }
            if self.is_stream_enabled(2) {
                self.screen.transcript(text)?;
            }
            Ok(())
        }
    }

    pub fn print_str(&mut self, text: &str) -> Result<(), RuntimeError> {
        let t: Vec<u16> = text.chars().map(|c| c as u16).collect();
        self.print(&t)
    }

    pub fn new_line(&mut self) -> Result<(), RuntimeError> {
        if self.is_stream_enabled(3) {
            self.print(&[0xd])
        } else {
            if self.is_stream_enabled(1) {
                self.screen.new_line()?;
            }
            if self.is_stream_enabled(2) {
                self.screen.transcript(&[0xd])?;
            }
            Ok(())
        }
    }

    /// Select an input stream; only the keyboard (0) is available
    pub fn input_stream(&mut self, stream: u16) -> Result<(), RuntimeError> {
        if stream == 0 {
            Ok(())
        } else {
            recoverable_error!(
                ErrorCode::InvalidInput,
                "Input stream {} is not available",
                stream
            )
        }
    }

    // Screen delegation
    pub fn rows(&self) -> u16 {
        self.screen.rows()
    }

    pub fn columns(&self) -> u16 {
        self.screen.columns()
    }

    pub fn split_window(&mut self, lines: u16) -> Result<(), RuntimeError> {
        self.screen.split_window(lines)
    }

    pub fn set_window(&mut self, window: u16) -> Result<(), RuntimeError> {
        self.screen.set_window(window)
    }

    pub fn erase_window(&mut self, window: i16) -> Result<(), RuntimeError> {
        self.screen.erase_window(window)
    }

    pub fn erase_line(&mut self) -> Result<(), RuntimeError> {
        self.screen.erase_line()
    }

    pub fn set_cursor(&mut self, row: u16, column: u16) -> Result<(), RuntimeError> {
        self.screen.set_cursor(row, column)
    }

    pub fn cursor(&mut self) -> Result<(u16, u16), RuntimeError> {
        self.screen.cursor()
    }

    pub fn set_text_style(&mut self, style: u16) -> Result<(), RuntimeError> {
        self.screen.set_text_style(style)
    }

    pub fn set_colour(&mut self, foreground: u16, background: u16) -> Result<(), RuntimeError> {
        self.screen.set_colour(foreground, background)
    }

    pub fn buffer_mode(&mut self, mode: u16) -> Result<(), RuntimeError> {
        self.screen.buffer_mode(mode)
    }

    pub fn set_font(&mut self, font: u16) -> Result<u16, RuntimeError> {
        self.screen.set_font(font)
    }

    // Sound delegation
    pub fn play_sound(
        &mut self,
        number: u16,
        effect: u16,
        volume: u8,
        repeats: u8,
    ) -> Result<(), RuntimeError> {
        self.sound.play(number, effect, volume, repeats)
    }

    pub fn stop_sound(&mut self) -> Result<(), RuntimeError> {
        self.sound.stop()
    }

    pub fn beep(&mut self) -> Result<(), RuntimeError> {
        self.sound.beep()
    }

    // Status line
    /// Build the left (object short name) and right (score/turns or
    /// time) status line fields from globals 1-3
    pub fn status_line(&mut self) -> Result<(Vec<u16>, Vec<u16>), RuntimeError> {
        let status_type = header::flag1(&self.memory, Flags1v3::StatusLineType)?;
        let object = self.variable(16)? as usize;
        let left = text::from_vec(self, &object::short_name(self, object)?, false)?;
        let right: Vec<u16> = if status_type == 0 {
            // Score is between -99 and 999 inclusive
            let score = i16::min(999, i16::max(-99, self.variable(17)? as i16));
            // Turns is between 0 and 9999 inclusive
            let turns = u16::min(9999, self.variable(18)?);
            format!("{:<8}", format!("{}/{}", score, turns))
                .chars()
                .map(|c| c as u16)
                .collect()
        } else {
            // Hour is between 0 and 23, minute between 0 and 59, inclusive
            let hour = u16::min(23, self.variable(17)?);
            let minute = u16::min(59, self.variable(18)?);
            let suffix = if hour > 11 { "PM" } else { "AM" };
            let h = if hour == 0 {
                12
            } else if hour > 12 {
                hour - 12
            } else {
                hour
            };

            format!("{:2}:{:02} {}", h, minute, suffix)
                .chars()
                .map(|c| c as u16)
                .collect()
        };

        Ok((left, right))
    }

    pub fn show_status(&mut self) -> Result<(), RuntimeError> {
        let (left, right) = self.status_line()?;
        self.screen.status_line(&left, &right)
    }

    // Save/restore
    /// Save the machine state; `pc` is the address of the save
    /// instruction's branch (V3) or store (V4+) byte
    pub fn save(&mut self, pc: usize) -> Result<(), RuntimeError> {
        let quetzal = Quetzal::try_from((&*self, pc))?;
        debug!(target: "app::state", "Saving game state @ ${:05x}", pc);
        let name = self.name.clone();
        self.persistence.save(&name, &Vec::from(quetzal))
    }

    /// Restore a saved state, returning the saved program counter
    pub fn restore(&mut self) -> Result<Option<usize>, RuntimeError> {
        let name = self.name.clone();
        let data = self.persistence.restore(&name)?;
        let quetzal = Quetzal::try_from(&data)?;
        debug!(target: "app::state", "Restoring game state");

        // Verify the save was created from this story file
        let ifhd = IFhd::try_from((&*self, 0))?;
        if &ifhd != quetzal.ifhd() {
            error!(target: "app::state", "Save file was created from a different story");
            recoverable_error!(
                ErrorCode::Restore,
                "Save file was created from a different story file"
            )
        } else {
            self.restore_state(quetzal)
        }
    }

    fn restore_state(&mut self, quetzal: Quetzal) -> Result<Option<usize>, RuntimeError> {
        // Flags2 bits the player controls survive the restore
        let flags2 = header::field_word(&self.memory, HeaderField::Flags2)?;

        if quetzal.mem().compressed() {
            self.memory.restore_compressed(quetzal.mem().memory())?
        } else {
            self.memory.restore(quetzal.mem().memory())?
        }

        self.frames = Vec::from(quetzal.stks());
        self.initialize()?;
        header::set_word(&mut self.memory, HeaderField::Flags2, flags2)?;

        Ok(Some(quetzal.ifhd().pc() as usize))
    }

    // Undo
    pub fn save_undo(&mut self, pc: usize) -> Result<(), RuntimeError> {
        let quetzal = Quetzal::try_from((&*self, pc))?;
        debug!(target: "app::state", "Storing undo state");
        self.undo_stack.push_back(quetzal);
        while self.undo_stack.len() > self.undo_limit {
            // Discard the oldest states
            self.undo_stack.pop_front();
        }
        Ok(())
    }

    pub fn restore_undo(&mut self) -> Result<Option<usize>, RuntimeError> {
        if let Some(quetzal) = self.undo_stack.pop_back() {
            debug!(target: "app::state", "Restoring undo state");
            self.restore_state(quetzal)
        } else {
            warn!(target: "app::state", "No saved state for undo");
            recoverable_error!(ErrorCode::UndoNoState, "Undo stack is empty")
        }
    }

    /// Reset to the initial state, preserving the transcript and
    /// fixed-pitch bits of Flags2
    pub fn restart(&mut self) -> Result<usize, RuntimeError> {
        self.rng.seed(0);

        let flags2 = header::field_word(&self.memory, HeaderField::Flags2)? & 0x3;

        self.memory.reset();
        self.frames.clear();
        self.stream_3.clear();
        self.output_streams &= 0x3;

        self.initialize()?;
        let f2 = header::field_word(&self.memory, HeaderField::Flags2)? & 0xFFFC;
        header::set_word(&mut self.memory, HeaderField::Flags2, f2 | flags2)?;

        self.run_state = RunState::Running;
        self.current_frame().map(|f| f.pc())
    }

    // Runtime
    pub fn set_run_state(&mut self, run_state: RunState) {
        self.run_state = run_state;
    }

    /// Warn the player about a recoverable error, honouring the
    /// configured handling mode.  Returns `true` when execution should
    /// continue.
    fn recover(&mut self, error: &RuntimeError) -> Result<bool, RuntimeError> {
        match self.error_handling {
            ErrorHandling::Abort => Ok(false),
            ErrorHandling::Ignore => Ok(true),
            ErrorHandling::ContinueWarnAlways => {
                self.print_str(&format!("\r[{}]\r", error))?;
                Ok(true)
            }
            ErrorHandling::ContinueWarnOnce => {
                if !self.errors.contains(&error.code()) {
                    self.errors.insert(error.code());
                    self.print_str(&format!(
                        "\r[{}]\r[This message will not be repeated]\r",
                        error
                    ))?;
                }
                Ok(true)
            }
        }
    }

    fn apply(
        &mut self,
        result: Result<NextAddress, RuntimeError>,
        recovery_address: usize,
    ) -> Result<RunState, RuntimeError> {
        match result {
            Ok(NextAddress::Address(a)) => {
                // READ and READ_CHAR return their own address when
                // suspending; the frame pc is where execution resumes
                self.current_frame_mut()?.set_pc(a);
                Ok(self.run_state.clone())
            }
            Ok(NextAddress::Quit) => {
                self.run_state = RunState::Stopped;
                Ok(RunState::Stopped)
            }
            Err(e) => {
                if e.is_recoverable() && self.recover(&e)? {
                    warn!(target: "app::state", "Recoverable error: {}", e);
                    self.current_frame_mut()?.set_pc(recovery_address);
                    Ok(self.run_state.clone())
                } else {
                    error!(target: "app::state", "{}", e);
                    self.run_state = RunState::Stopped;
                    Err(e)
                }
            }
        }
    }

    /// Decode and execute the instruction at the current program
    /// counter, returning the resulting run state
    pub fn step(&mut self) -> Result<RunState, RuntimeError> {
        if self.run_state != RunState::Running {
            return recoverable_error!(
                ErrorCode::InvalidRunState,
                "step() while {:?}",
                self.run_state
            );
        }

        let pc = self.current_frame()?.pc();
        let instruction = decoder::decode_instruction(self, pc)?;
        self.instruction_count += 1;

        let result = processor::dispatch(self, &instruction);
        self.apply(result, instruction.next_address())
    }

    /// Complete a suspended READ with a line of input
    ///
    /// `input` holds ZSCII characters, including the terminator when
    /// input ended with one.
    pub fn resume_with_input(&mut self, input: &[u16]) -> Result<RunState, RuntimeError> {
        let (text_buffer, parse_buffer, length, terminators) = match &self.run_state {
            RunState::AwaitingLine {
                text_buffer,
                parse_buffer,
                length,
                terminators,
                ..
            } => (
                *text_buffer,
                *parse_buffer,
                *length,
                terminators.clone(),
            ),
            _ => {
                return recoverable_error!(
                    ErrorCode::InvalidRunState,
                    "resume_with_input() while {:?}",
                    self.run_state
                )
            }
        };

        self.run_state = RunState::Running;
        let pc = self.current_frame()?.pc();
        let instruction = decoder::decode_instruction(self, pc)?;
        let result = processor_var::read_post(
            self,
            &instruction,
            text_buffer,
            parse_buffer,
            length,
            &terminators,
            input,
        );
        self.apply(result, instruction.next_address())
    }

    /// Complete a suspended READ_CHAR with a single keypress
    pub fn resume_with_char(&mut self, zchar: u16) -> Result<RunState, RuntimeError> {
        if self.run_state != RunState::AwaitingChar {
            return recoverable_error!(
                ErrorCode::InvalidRunState,
                "resume_with_char() while {:?}",
                self.run_state
            );
        }

        self.run_state = RunState::Running;
        let pc = self.current_frame()?.pc();
        let instruction = decoder::decode_instruction(self, pc)?;
        let result = processor_var::read_char_post(self, &instruction, zchar);
        self.apply(result, instruction.next_address())
    }
}
