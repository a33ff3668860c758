#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    ToAcc,
    FromAcc,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    NotZero,
    Zero,
    NotCarry,
    Carry,
    ParityOdd,
    ParityEven,
    Positive,
    Negative,
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
    B = 0,
    C = 1,
    D = 2,
    E = 3,
    H = 4,
    L = 5,
    A = 6,
    F = 7,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RegisterPair {
    BC,
    DE,
    HL,
    AF,
    SP,
    IX,
    IY,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IndexRegister {
    IX,
    IY,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IndexRegisterHalf {
    IXH,
    IXL,
    IYH,
    IYL,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpecialRegister {
    I,
    R,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InterruptMode {
    Mode0,
    Mode1,
    Mode2,
    Unknown(u8),
}

/// Where an 8-bit operand lives
///
/// Operand values are not part of the descriptor. `IndirectOffset` reads its displacement
/// from the third byte of the instruction, and `Immediate` reads the last byte of the
/// instruction, at the moment the operand is accessed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    DirectReg(Register),
    DirectRegHalf(IndexRegisterHalf),
    IndirectReg(RegisterPair),
    IndirectOffset(IndexRegister),
    Immediate,
}

/// Source or destination of an `LD`, which may be a byte or a word
///
/// `IndirectByte` and `IndirectWord` take their address from the trailing word of the
/// instruction, and the immediates from the trailing byte or word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadTarget {
    DirectRegByte(Register),
    DirectRegHalfByte(IndexRegisterHalf),
    DirectRegWord(RegisterPair),
    IndirectRegByte(RegisterPair),
    IndirectOffsetByte(IndexRegister),
    IndirectByte,
    IndirectWord,
    ImmediateByte,
    ImmediateWord,
}

/// The register that receives a copy of the result of an undocumented `DD CB`/`FD CB` op
pub type UndocumentedCopy = Option<Register>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    ADCa(Target),
    ADC16(RegisterPair, RegisterPair),
    ADDa(Target),
    ADD16(RegisterPair, RegisterPair),
    AND(Target),
    BIT(u8, Target),
    CALL,
    CALLcc(Condition),
    CCF,
    CP(Target),
    CPD,
    CPDR,
    CPI,
    CPIR,
    CPL,
    DAA,
    DEC16(RegisterPair),
    DEC8(Target),
    DI,
    DJNZ,
    EI,
    EXX,
    EXafaf,
    EXhlde,
    EXsp(RegisterPair),
    HALT,
    IM(InterruptMode),
    INC16(RegisterPair),
    INC8(Target),
    IND,
    INDR,
    INI,
    INIR,
    INic(Register),
    INicz,
    INx,
    JP,
    JPIndirect(RegisterPair),
    JPcc(Condition),
    JR,
    JRcc(Condition),
    LD(LoadTarget, LoadTarget),
    LDsr(SpecialRegister, Direction),
    LDD,
    LDDR,
    LDI,
    LDIR,
    NEG,
    NOP,
    OR(Target),
    OTDR,
    OTIR,
    OUTD,
    OUTI,
    OUTic(Register),
    OUTicz,
    OUTx,
    POP(RegisterPair),
    PUSH(RegisterPair),
    RES(u8, Target, UndocumentedCopy),
    RET,
    RETI,
    RETN,
    RETcc(Condition),
    RL(Target, UndocumentedCopy),
    RLA,
    RLC(Target, UndocumentedCopy),
    RLCA,
    RLD,
    RR(Target, UndocumentedCopy),
    RRA,
    RRC(Target, UndocumentedCopy),
    RRCA,
    RRD,
    RST(u8),
    SBCa(Target),
    SBC16(RegisterPair, RegisterPair),
    SCF,
    SET(u8, Target, UndocumentedCopy),
    SLA(Target, UndocumentedCopy),
    SLL(Target, UndocumentedCopy),
    SRA(Target, UndocumentedCopy),
    SRL(Target, UndocumentedCopy),
    SUB(Target),
    XOR(Target),
}

impl From<u8> for InterruptMode {
    fn from(im: u8) -> Self {
        match im {
            0 => InterruptMode::Mode0,
            1 => InterruptMode::Mode1,
            2 => InterruptMode::Mode2,
            _ => InterruptMode::Unknown(im),
        }
    }
}

impl From<InterruptMode> for u8 {
    fn from(im: InterruptMode) -> Self {
        match im {
            InterruptMode::Mode0 => 0,
            InterruptMode::Mode1 => 1,
            InterruptMode::Mode2 => 2,
            InterruptMode::Unknown(im) => im,
        }
    }
}

impl From<IndexRegister> for RegisterPair {
    fn from(value: IndexRegister) -> Self {
        match value {
            IndexRegister::IX => RegisterPair::IX,
            IndexRegister::IY => RegisterPair::IY,
        }
    }
}

impl RegisterPair {
    pub(crate) fn is_index_reg(&self) -> bool {
        matches!(self, RegisterPair::IX | RegisterPair::IY)
    }
}
