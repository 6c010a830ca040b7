//! ELF specification constants.

// ELF header constants
pub const ELF_MAGIC: u32 = 0x464C_457F; // 0x7F 'E' 'L' 'F'
pub const ELF_CLASS_32: u8 = 1;
pub const ELF_CLASS_64: u8 = 2;
pub const ELF_DATA_LSB: u8 = 1;
pub const ELF_VERSION_CURRENT: u8 = 1;
pub const ELF_TYPE_EXEC: u16 = 2;
pub const ELF_MACHINE_RISCV: u16 = 243;

// Header sizes
pub const ELF32_EHDR_SIZE: usize = 52;
pub const ELF64_EHDR_SIZE: usize = 64;
pub const ELF32_PHDR_SIZE: usize = 32;
pub const ELF64_PHDR_SIZE: usize = 56;

// Program header types
pub const PT_NULL: u32 = 0;
pub const PT_LOAD: u32 = 1;

// Program header flags
pub const PF_X: u32 = 0x1; // Execute
pub const PF_W: u32 = 0x2; // Write
pub const PF_R: u32 = 0x4; // Read

// RISC-V ELF e_flags
pub const EF_RISCV_RVC: u32 = 0x1;

// Limits
pub const MAX_SEGMENTS: usize = 16;
