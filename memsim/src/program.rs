//! Instruction streams for the paging engine.

use crate::helpe::*;

/// What an instruction does with the word it touches. Only
/// [`Op::Save`] writes; everything else merely reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Load,
    Save,
}

impl Op {
    #[inline(always)]
    pub fn is_write(&self) -> bool {
        matches!(self, Op::Save)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Op::Add     => "+",
            Op::Sub     => "-",
            Op::Mul     => "×",
            Op::Div     => "/",
            Op::Load    => "load",
            Op::Save    => "save",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Op {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "+" | "add"                             => Ok(Op::Add),
            "-" | "—" | "−" | "sub"                 => Ok(Op::Sub),
            "*" | "×" | "╳" | "x" | "mul"           => Ok(Op::Mul),
            "/" | "÷" | "div"                       => Ok(Op::Div),
            "load" | "取" | "取(load)"              => Ok(Op::Load),
            "save" | "store" | "存" | "存(save)"    => Ok(Op::Save),
            other                                   => Err(format!("unknown operation `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// 1-based position within its program.
    pub seq:    usize,
    pub op:     Op,
    pub page:   PageNo,
    pub offset: Units,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(steps: Vec<(Op, PageNo, Units)>) -> Self {
        let instructions = steps.into_iter()
            .enumerate()
            .map(|(idx, (op, page, offset))| Instruction { seq: idx + 1, op, page, offset })
            .collect();

        Self { instructions }
    }

    /// The twelve-instruction textbook exercise: a 7-page job whose
    /// stream touches every page and writes to three of them.
    pub fn classic() -> Self {
        Self::new(vec![
            (Op::Add,   0, 72),
            (Op::Div,   1, 50),
            (Op::Mul,   2, 15),
            (Op::Save,  3, 26),
            (Op::Load,  0, 56),
            (Op::Sub,   6, 40),
            (Op::Add,   4, 56),
            (Op::Sub,   5, 23),
            (Op::Save,  1, 37),
            (Op::Add,   2, 78),
            (Op::Sub,   4, 1),
            (Op::Save,  6, 86),
        ])
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Smallest page count able to run the program, 0 if empty.
    pub fn pages_needed(&self) -> usize {
        self.instructions.iter()
            .map(|i| i.page + 1)
            .max()
            .unwrap_or(0)
    }
}

/// The fate of one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub instruction:    Instruction,
    pub result:         Result<AccessResult, PagingError>,
}

/// Feeds a [Program] to one job of a [PagingEngine], one
/// instruction at a time.
pub struct ProgramRunner<'a> {
    engine:     &'a mut PagingEngine,
    job:        JobId,
    program:    &'a Program,
    cursor:     usize,
}

impl<'a> ProgramRunner<'a> {
    /// Fails if `job` does not exist.
    pub fn new(engine: &'a mut PagingEngine, job: JobId, program: &'a Program) -> Result<Self, PagingError> {
        if engine.job(job).is_none() {
            return Err(PagingError::UnknownJob(job));
        }

        Ok(Self { engine, job, program, cursor: 0 })
    }

    /// Executes the next instruction. A rejected instruction still
    /// counts as executed: the cursor moves on regardless.
    pub fn step(&mut self) -> Option<StepOutcome> {
        let instruction = *self.program.instructions.get(self.cursor)?;
        self.cursor += 1;
        let result = self.engine.access(self.job, instruction.op, instruction.page, instruction.offset);

        Some(StepOutcome { instruction, result })
    }

    pub fn run_to_end(&mut self) -> Vec<StepOutcome> {
        let mut res = vec![];
        while let Some(outcome) = self.step() {
            res.push(outcome);
        }

        res
    }

    /// Resets the job and starts over.
    pub fn rewind(&mut self) -> Result<(), PagingError> {
        self.engine.reset(self.job)?;
        self.cursor = 0;

        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.program.len()
    }

    /// Number of instructions already executed.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn engine(&self) -> &PagingEngine {
        &*self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_spellings() {
        for (raw, op) in [
            ("+", Op::Add), ("—", Op::Sub), ("╳", Op::Mul), ("×", Op::Mul),
            ("/", Op::Div), ("取(load)", Op::Load), ("存(save)", Op::Save), ("SAVE", Op::Save),
        ] {
            assert_eq!(raw.parse::<Op>(), Ok(op), "{raw}");
        }
        assert!("%".parse::<Op>().is_err());
        assert!(Op::Save.is_write());
        assert!(!Op::Load.is_write());
    }

    #[test]
    fn classic_program_shape() {
        let p = Program::classic();
        assert_eq!(p.len(), 12);
        assert_eq!(p.pages_needed(), 7);
        assert_eq!(p.instructions()[3], Instruction { seq: 4, op: Op::Save, page: 3, offset: 26 });
        assert_eq!(Program::default().pages_needed(), 0);
    }
}
