//! Routine call stack frame
use crate::error::{ErrorCode, RuntimeError};
use crate::recoverable_error;
use crate::instruction::StoreResult;
use crate::quetzal::{Stk, Stks};

#[derive(Debug)]
/// Stack frame
pub struct Frame {
    /// Address of the routine this frame is executing
    address: usize,
    /// Address of the executing or most-recently executed instruction
    pc: usize,
    /// Local variable storage
    local_variables: Vec<u16>,
    /// Number of arguments to the routine
    argument_count: u8,
    /// Stack
    stack: Vec<u16>,
    /// [Option] with the [StoreResult] location for this frame or [None]
    result: Option<StoreResult>,
    /// The address to return to when this frame returns
    return_address: usize,
}

impl From<&Stk> for Frame {
    fn from(value: &Stk) -> Self {
        let result = if value.flags() & 0x10 == 0x00 {
            Some(StoreResult::new(0, value.result_variable()))
        } else {
            None
        };
        Frame::new(
            0,
            0,
            value.variables(),
            value.arguments(),
            value.stack(),
            result,
            value.return_address() as usize,
        )
    }
}

impl From<&Stks> for Vec<Frame> {
    fn from(value: &Stks) -> Self {
        value.stks().iter().map(Frame::from).collect()
    }
}

impl Frame {
    /// Constructor
    ///
    /// # Arguments
    /// * `address` - address of the routine header this frame will execute
    /// * `pc` - address of the first instruction to execute
    /// * `local_variables` - local variable storage
    /// * `argument_count` - number of arguments passed to the routine
    /// * `stack` - stack
    /// * `result` - [Option] with [StoreResult] location or [None]
    /// * `return_address` - Address to resume execution at when frame returns
    pub fn new(
        address: usize,
        pc: usize,
        local_variables: &[u16],
        argument_count: u8,
        stack: &[u16],
        result: Option<StoreResult>,
        return_address: usize,
    ) -> Frame {
        Frame {
            address,
            pc,
            local_variables: local_variables.to_vec(),
            argument_count,
            stack: stack.to_vec(),
            result,
            return_address,
        }
    }

    /// Get the address of the routine this frame is executing
    pub fn address(&self) -> usize {
        self.address
    }

    /// Get the address of the currently executing instruction
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Set the address of the currently executing instruction
    pub fn set_pc(&mut self, pc: usize) {
        self.pc = pc;
    }

    /// Get a reference to local variable storage
    pub fn local_variables(&self) -> &Vec<u16> {
        &self.local_variables
    }

    /// Get the number of arguments passed to the frame's routine
    pub fn argument_count(&self) -> u8 {
        self.argument_count
    }

    /// Get a reference to the stack
    pub fn stack(&self) -> &Vec<u16> {
        &self.stack
    }

    /// Pops the value from the top of the stack
    ///
    /// # Returns
    /// [Result] containing the value from the top of the stack or [RuntimeError]
    pub fn pop(&mut self) -> Result<u16, RuntimeError> {
        if let Some(v) = self.stack.pop() {
            debug!(target: "app::state", "Pop {:04x} [{}]", v, self.stack.len());
            Ok(v)
        } else {
            recoverable_error!(ErrorCode::StackUnderflow, "Popped an empty stack")
        }
    }

    /// Peeks at the value on the top of the stack without removing it
    ///
    /// # Returns
    /// [Result] containing the value from the top of the stack or [RuntimeError]
    pub fn peek(&self) -> Result<u16, RuntimeError> {
        if let Some(v) = self.stack.last() {
            Ok(*v)
        } else {
            recoverable_error!(ErrorCode::StackUnderflow, "Peeked an empty stack")
        }
    }

    /// Pushes a value onto the stack
    ///
    /// # Arguments
    /// * `value` - Value to push
    pub fn push(&mut self, value: u16) {
        self.stack.push(value);
        debug!(target: "app::state", "Push {:04x} [{}]", value, self.stack.len());
    }

    /// Gets the store location for the routine
    ///
    /// # Returns
    /// [Option] with a reference to the [StoreResult] or [None]
    pub fn result(&self) -> Option<&StoreResult> {
        self.result.as_ref()
    }

    /// Gets the return address for the routine
    ///
    /// # Returns
    /// Address to resume execution at when the routine returns
    pub fn return_address(&self) -> usize {
        self.return_address
    }

    /// Gets the value of a local variable.
    ///
    /// If local variable 0 is read, the value is popped from the stack.
    ///
    /// # Arguments
    /// * `variable` - Local variable number, which should be 0 (stack) or from 1 to the number of local variables
    ///
    /// # Returns
    /// [Result] with the local variable value or a [RuntimeError]
    pub fn local_variable(&mut self, variable: u8) -> Result<u16, RuntimeError> {
        if variable == 0 {
            self.pop()
        } else if variable <= self.local_variables.len() as u8 {
            Ok(self.local_variables[variable as usize - 1])
        } else {
            recoverable_error!(
                ErrorCode::InvalidLocalVariable,
                "Read from invalid local variable {} out of range: {}",
                variable,
                self.local_variables.len()
            )
        }
    }

    /// Peeks at a local variable without removing any values from the stack.
    ///
    /// If local variable 0 is read, the value is peeked from the stack.
    ///
    /// # Arguments
    /// * `variable` - Local variable number, which should be 0 (stack) or from 1 to the number of local variables
    pub fn peek_local_variable(&self, variable: u8) -> Result<u16, RuntimeError> {
        if variable == 0 {
            self.peek()
        } else if variable <= self.local_variables.len() as u8 {
            Ok(self.local_variables[variable as usize - 1])
        } else {
            recoverable_error!(
                ErrorCode::InvalidLocalVariable,
                "Peek from local variable {} out of range: {}",
                variable,
                self.local_variables.len()
            )
        }
    }

    /// Set a local variable
    ///
    /// If local variable 0 is set, the value is pushed onto the stack
    ///
    /// # Arguments
    /// * `variable` - Local variable number, which should be 0 (stack) or from 1 to the number of local variables
    /// * `value` - Value to set
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn set_local_variable(&mut self, variable: u8, value: u16) -> Result<(), RuntimeError> {
        if variable == 0 {
            self.push(value);
            Ok(())
        } else if variable <= self.local_variables.len() as u8 {
            self.local_variables[variable as usize - 1] = value;
            Ok(())
        } else {
            recoverable_error!(
                ErrorCode::InvalidLocalVariable,
                "Write to local variable {} out of range: {}",
                variable,
                self.local_variables.len()
            )
        }
    }

    /// Set a local variable indirectly.
    ///
    /// If local variable 0 is set, the value will replace the value currently at the top of the stack.
    ///
    /// # Arguments
    /// * `variable` - Local variable number, which should be 0 (stack) or from 1 to the number of local variables
    /// * `value` - Value to set
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn set_local_variable_indirect(
        &mut self,
        variable: u8,
        value: u16,
    ) -> Result<(), RuntimeError> {
        if variable == 0 {
            self.pop()?;
            self.push(value);
            Ok(())
        } else if variable <= self.local_variables.len() as u8 {
            self.local_variables[variable as usize - 1] = value;
            Ok(())
        } else {
            recoverable_error!(
                ErrorCode::InvalidLocalVariable,
                "Write to local variable {} out of range: {}",
                variable,
                self.local_variables.len()
            )
        }
    }

    /// Create a new frame for a routine call
    ///
    /// # Arguments
    /// * `address` - Address of the routine header
    /// * `initial_pc` - Address of the instruction to begin execution for the routine
    /// * `arguments` - Arguments to the routine call
    /// * `local_variables` - Local variable storage pre-loaded with default local variable values
    /// * `result` - [Option] with [StoreResult] location or [None]
    /// * `return_address` - Address to resume execution when the routine returns
    pub fn call_routine(
        address: usize,
        initial_pc: usize,
        arguments: &[u16],
        local_variables: Vec<u16>,
        result: Option<StoreResult>,
        return_address: usize,
    ) -> Result<Frame, RuntimeError> {
        let mut lv = local_variables;

        for (i, arg) in arguments.iter().enumerate() {
            if lv.len() > i {
                lv[i] = *arg;
            }
        }

        Ok(Frame::new(
            address,
            initial_pc,
            &lv,
            arguments.len() as u8,
            &[],
            result,
            return_address,
        ))
    }
}
