use once_cell::sync::Lazy;
use serde::Serialize;

#[cfg(target_arch = "x86_64")]
pub fn cpuid(eax: u32, ecx: u32) -> (u32, u32, u32, u32) {
    let mut ebx: u32;
    let mut edx: u32;
    let mut eax_out = eax;
    let mut ecx_out = ecx;

    unsafe {
        std::arch::asm!(
            "mov {0:r}, rbx",
            "cpuid",
            "xchg {0:r}, rbx",
            out(reg) ebx,
            inout("eax") eax_out,
            inout("ecx") ecx_out,
            out("edx") edx,
            options(nostack, preserves_flags)
        );
    }

    (eax_out, ebx, ecx_out, edx)
}

#[cfg(not(target_arch = "x86_64"))]
pub fn cpuid(_eax: u32, _ecx: u32) -> (u32, u32, u32, u32) {
    (0, 0, 0, 0)
}

/// Family/model and logical core count from CPUID leaf 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuSignature {
    pub family: u32,
    pub model: u32,
    pub stepping: u32,
    pub logical_cores: u32,
    pub brand: String,
}

impl CpuSignature {
    /// Decode leaf 1 EAX/EBX the way AMD documents it: extended family and
    /// model are always added in
    pub fn from_leaf1(eax: u32, ebx: u32, brand: String) -> Self {
        Self {
            family: ((eax & 0xF00) >> 8) + ((eax & 0x0FF0_0000) >> 20),
            model: ((eax & 0xF_0000) >> 12) + ((eax & 0xF0) >> 4),
            stepping: eax & 0xF,
            logical_cores: (ebx >> 16) & 0xFF,
            brand,
        }
    }

    pub fn detect() -> Self {
        let (eax, ebx, _ecx, _edx) = cpuid(1, 0);
        let signature = Self::from_leaf1(eax, ebx, brand_string());

        tracing::info!(
            "CPU: Family {:X}, Model {:X}, Stepping {:X}, {} logical cores",
            signature.family,
            signature.model,
            signature.stepping,
            signature.logical_cores
        );

        signature
    }
}

pub static CPU_SIGNATURE: Lazy<CpuSignature> = Lazy::new(CpuSignature::detect);

/// Processor brand string from leaves 0x8000_0002..=0x8000_0004
pub fn brand_string() -> String {
    let mut bytes = Vec::with_capacity(48);
    for leaf in 0x8000_0002u32..=0x8000_0004 {
        let (eax, ebx, ecx, edx) = cpuid(leaf, 0);
        for reg in [eax, ebx, ecx, edx] {
            bytes.extend_from_slice(&reg.to_le_bytes());
        }
    }
    decode_brand(&bytes)
}

fn decode_brand(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf1_decode_zen2() {
        // Ryzen 9 3950X: family 17h model 71h, 32 logical cores
        let sig = CpuSignature::from_leaf1(0x0087_0F10, 0x2020_0800, String::new());
        assert_eq!(sig.family, 0x17);
        assert_eq!(sig.model, 0x71);
        assert_eq!(sig.stepping, 0);
        assert_eq!(sig.logical_cores, 32);
    }

    #[test]
    fn test_brand_is_trimmed() {
        let mut raw = b"  AMD Ryzen 9 3950X 16-Core Processor  ".to_vec();
        raw.resize(48, 0);
        assert_eq!(decode_brand(&raw), "AMD Ryzen 9 3950X 16-Core Processor");
    }
}
