#[cfg(test)]
mod tests {
    use crate::lr35902::cpu::*;
    use crate::lr35902::sm83::*;
    use crate::memory::mapper::Mapper;
    use crate::memory::mmu::*;
    use serde_json::Value;

    /// Single-step cases in the SM83 JSON test format: registers and memory before and after
    /// one instruction, plus one entry per machine cycle.
    const SINGLE_STEP_CASES: &str = r#"[
        {"name": "80 add a,b carries out", "initial": {"pc": 4096, "sp": 53248, "a": 58, "b": 198, "c": 0, "d": 0, "e": 0, "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 128]]},
         "final": {"pc": 4097, "sp": 53248, "a": 0, "b": 198, "c": 0, "d": 0, "e": 0, "f": 176, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 128]]},
         "cycles": [[4096, 128, "read"]]},
        {"name": "8e adc a,(hl)", "initial": {"pc": 4096, "sp": 53248, "a": 15, "b": 0, "c": 0, "d": 0, "e": 0, "f": 16, "h": 193, "l": 0, "ime": 0, "ram": [[4096, 142], [49408, 1]]},
         "final": {"pc": 4097, "sp": 53248, "a": 17, "b": 0, "c": 0, "d": 0, "e": 0, "f": 32, "h": 193, "l": 0, "ime": 0, "ram": [[4096, 142], [49408, 1]]},
         "cycles": [[4096, 142, "read"], [49408, 1, "read"]]},
        {"name": "9f sbc a,a with carry", "initial": {"pc": 4096, "sp": 53248, "a": 66, "b": 0, "c": 0, "d": 0, "e": 0, "f": 16, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 159]]},
         "final": {"pc": 4097, "sp": 53248, "a": 255, "b": 0, "c": 0, "d": 0, "e": 0, "f": 112, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 159]]},
         "cycles": [[4096, 159, "read"]]},
        {"name": "de sbc a,n", "initial": {"pc": 4096, "sp": 53248, "a": 16, "b": 0, "c": 0, "d": 0, "e": 0, "f": 16, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 222], [4097, 1]]},
         "final": {"pc": 4098, "sp": 53248, "a": 14, "b": 0, "c": 0, "d": 0, "e": 0, "f": 96, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 222], [4097, 1]]},
         "cycles": [[4096, 222, "read"], [4097, 1, "read"]]},
        {"name": "27 daa overflows", "initial": {"pc": 4096, "sp": 53248, "a": 154, "b": 0, "c": 0, "d": 0, "e": 0, "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 39]]},
         "final": {"pc": 4097, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 144, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 39]]},
         "cycles": [[4096, 39, "read"]]},
        {"name": "32 ld (hl-),a", "initial": {"pc": 4096, "sp": 53248, "a": 85, "b": 0, "c": 0, "d": 0, "e": 0, "f": 160, "h": 192, "l": 0, "ime": 0, "ram": [[4096, 50]]},
         "final": {"pc": 4097, "sp": 53248, "a": 85, "b": 0, "c": 0, "d": 0, "e": 0, "f": 160, "h": 191, "l": 255, "ime": 0, "ram": [[4096, 50], [49152, 85]]},
         "cycles": [[4096, 50, "read"], [49152, 85, "write"]]},
        {"name": "20 jr nz taken", "initial": {"pc": 4096, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 32], [4097, 251]]},
         "final": {"pc": 4093, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 32], [4097, 251]]},
         "cycles": [[4096, 32, "read"], [4097, 251, "read"], [null, null, "---"]]},
        {"name": "20 jr nz not taken", "initial": {"pc": 4096, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 128, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 32], [4097, 251]]},
         "final": {"pc": 4098, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 128, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 32], [4097, 251]]},
         "cycles": [[4096, 32, "read"], [4097, 251, "read"]]},
        {"name": "cd call nn", "initial": {"pc": 4096, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 205], [4097, 52], [4098, 18]]},
         "final": {"pc": 4660, "sp": 53246, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 205], [4097, 52], [4098, 18], [53246, 3], [53247, 16]]},
         "cycles": [[4096, 205, "read"], [4097, 52, "read"], [4098, 18, "read"], [null, null, "---"], [53247, 16, "write"], [53246, 3, "write"]]},
        {"name": "c9 ret", "initial": {"pc": 4096, "sp": 53246, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 201], [53246, 120], [53247, 86]]},
         "final": {"pc": 22136, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 201], [53246, 120], [53247, 86]]},
         "cycles": [[4096, 201, "read"], [53246, 120, "read"], [53247, 86, "read"], [null, null, "---"]]},
        {"name": "c0 ret nz not taken", "initial": {"pc": 4096, "sp": 53246, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 128, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 192]]},
         "final": {"pc": 4097, "sp": 53246, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 128, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 192]]},
         "cycles": [[4096, 192, "read"], [null, null, "---"]]},
        {"name": "f1 pop af", "initial": {"pc": 4096, "sp": 53246, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 241], [53246, 255], [53247, 18]]},
         "final": {"pc": 4097, "sp": 53248, "a": 18, "b": 0, "c": 0, "d": 0, "e": 0, "f": 240, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 241], [53246, 255], [53247, 18]]},
         "cycles": [[4096, 241, "read"], [53246, 255, "read"], [53247, 18, "read"]]},
        {"name": "f5 push af", "initial": {"pc": 4096, "sp": 53248, "a": 18, "b": 0, "c": 0, "d": 0, "e": 0, "f": 176, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 245]]},
         "final": {"pc": 4097, "sp": 53246, "a": 18, "b": 0, "c": 0, "d": 0, "e": 0, "f": 176, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 245], [53246, 176], [53247, 18]]},
         "cycles": [[4096, 245, "read"], [null, null, "---"], [53247, 18, "write"], [53246, 176, "write"]]},
        {"name": "cb 36 swap (hl)", "initial": {"pc": 4096, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 240, "h": 193, "l": 35, "ime": 0, "ram": [[4096, 203], [4097, 54], [49443, 240]]},
         "final": {"pc": 4098, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 0, "h": 193, "l": 35, "ime": 0, "ram": [[4096, 203], [4097, 54], [49443, 15]]},
         "cycles": [[4096, 203, "read"], [4097, 54, "read"], [49443, 240, "read"], [49443, 15, "write"]]},
        {"name": "f8 ld hl,sp-15", "initial": {"pc": 4096, "sp": 53263, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 192, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 248], [4097, 241]]},
         "final": {"pc": 4098, "sp": 53263, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 48, "h": 208, "l": 0, "ime": 0, "ram": [[4096, 248], [4097, 241]]},
         "cycles": [[4096, 248, "read"], [4097, 241, "read"], [null, null, "---"]]},
        {"name": "e8 add sp,8", "initial": {"pc": 4096, "sp": 53496, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 128, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 232], [4097, 8]]},
         "final": {"pc": 4098, "sp": 53504, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 48, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 232], [4097, 8]]},
         "cycles": [[4096, 232, "read"], [4097, 8, "read"], [null, null, "---"], [null, null, "---"]]},
        {"name": "39 add hl,sp", "initial": {"pc": 4096, "sp": 1541, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 128, "h": 138, "l": 35, "ime": 0, "ram": [[4096, 57]]},
         "final": {"pc": 4097, "sp": 1541, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 160, "h": 144, "l": 40, "ime": 0, "ram": [[4096, 57]]},
         "cycles": [[4096, 57, "read"], [null, null, "---"]]},
        {"name": "07 rlca", "initial": {"pc": 4096, "sp": 53248, "a": 133, "b": 0, "c": 0, "d": 0, "e": 0, "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 7]]},
         "final": {"pc": 4097, "sp": 53248, "a": 11, "b": 0, "c": 0, "d": 0, "e": 0, "f": 16, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 7]]},
         "cycles": [[4096, 7, "read"]]},
        {"name": "cb 7c bit 7,h", "initial": {"pc": 4096, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 16, "h": 127, "l": 0, "ime": 0, "ram": [[4096, 203], [4097, 124]]},
         "final": {"pc": 4098, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 176, "h": 127, "l": 0, "ime": 0, "ram": [[4096, 203], [4097, 124]]},
         "cycles": [[4096, 203, "read"], [4097, 124, "read"]]},
        {"name": "34 inc (hl)", "initial": {"pc": 4096, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 16, "h": 192, "l": 16, "ime": 0, "ram": [[4096, 52], [49168, 15]]},
         "final": {"pc": 4097, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 48, "h": 192, "l": 16, "ime": 0, "ram": [[4096, 52], [49168, 16]]},
         "cycles": [[4096, 52, "read"], [49168, 15, "read"], [49168, 16, "write"]]},
        {"name": "e0 ldh (n),a", "initial": {"pc": 4096, "sp": 53248, "a": 119, "b": 0, "c": 0, "d": 0, "e": 0, "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 224], [4097, 128]]},
         "final": {"pc": 4098, "sp": 53248, "a": 119, "b": 0, "c": 0, "d": 0, "e": 0, "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 224], [4097, 128], [65408, 119]]},
         "cycles": [[4096, 224, "read"], [4097, 128, "read"], [65408, 119, "write"]]},
        {"name": "08 ld (nn),sp", "initial": {"pc": 4096, "sp": 48879, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 8], [4097, 0], [4098, 194]]},
         "final": {"pc": 4099, "sp": 48879, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 8], [4097, 0], [4098, 194], [49664, 239], [49665, 190]]},
         "cycles": [[4096, 8, "read"], [4097, 0, "read"], [4098, 194, "read"], [49664, 239, "write"], [49665, 190, "write"]]},
        {"name": "3f ccf keeps zero", "initial": {"pc": 4096, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 240, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 63]]},
         "final": {"pc": 4097, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 128, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 63]]},
         "cycles": [[4096, 63, "read"]]},
        {"name": "d9 reti", "initial": {"pc": 4096, "sp": 53246, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 0, "h": 0, "l": 0, "ime": 0, "ram": [[4096, 217], [53246, 0], [53247, 32]]},
         "final": {"pc": 8192, "sp": 53248, "a": 0, "b": 0, "c": 0, "d": 0, "e": 0, "f": 0, "h": 0, "l": 0, "ime": 1, "ram": [[4096, 217], [53246, 0], [53247, 32]]},
         "cycles": [[4096, 217, "read"], [53246, 0, "read"], [53247, 32, "read"], [null, null, "---"]]}
    ]"#;

    /// Cartridge covering the whole ROM and RAM windows with writable memory, so fixtures can
    /// place code anywhere.
    #[derive(Clone)]
    struct FlatMapper {
        memory: Vec<u8>,
    }

    impl Mapper for FlatMapper {
        fn read(&self, addr: u16) -> u8 {
            self.memory[addr as usize]
        }

        fn write(&mut self, addr: u16, data: u8) {
            self.memory[addr as usize] = data;
        }

        fn dump_ram(&self) -> Vec<u8> {
            Vec::new()
        }

        fn load_ram(&mut self, _ram: Vec<u8>) {}

        fn current_rom_bank(&self) -> u16 {
            1
        }

        fn current_ram_bank(&self) -> u8 {
            0
        }

        fn name(&self) -> String {
            String::from("FLAT")
        }
    }

    fn field(state: &serde_json::Map<String, Value>, name: &str) -> u64 {
        state.get(name).unwrap().as_u64().unwrap()
    }

    #[test]
    fn test_cpu() {
        let tests: Value = serde_json::from_str(SINGLE_STEP_CASES).unwrap();

        for test in tests.as_array().unwrap() {
            let mut mmu = Mmu::new(
                vec![],
                Box::new(FlatMapper {
                    memory: vec![0u8; 0x10000],
                }),
            );
            let mut cpu = Cpu::new();

            let test = test.as_object().unwrap();
            let name = test.get("name").unwrap().as_str().unwrap();
            let initial = test.get("initial").unwrap().as_object().unwrap();
            let final_state = test.get("final").unwrap().as_object().unwrap();
            let machine_cycles = test.get("cycles").unwrap().as_array().unwrap().len();

            for (register, key) in [
                (Register::A, "a"),
                (Register::F, "f"),
                (Register::B, "b"),
                (Register::C, "c"),
                (Register::D, "d"),
                (Register::E, "e"),
                (Register::H, "h"),
                (Register::L, "l"),
            ] {
                cpu.write_register(&register, field(initial, key) as u8);
            }
            cpu.write_register16(&Register::SP, field(initial, "sp") as u16);
            cpu.write_register16(&Register::PC, field(initial, "pc") as u16);
            if field(initial, "ime") == 1 {
                cpu.ime_mut().enable();
            }

            let ram = initial.get("ram").unwrap().as_array().unwrap();
            for value in ram {
                let addr = value.as_array().unwrap()[0].as_u64().unwrap() as u16;
                let value = value.as_array().unwrap()[1].as_u64().unwrap() as u8;

                mmu.write(addr, value);
            }

            match cpu.decode(&mmu, cpu.read_register16(&Register::PC)) {
                Ok(instruction) => println!("{}: {}", name, instruction),
                Err(e) => panic!("Failed to decode instruction for {}: {}", name, e),
            }

            let cycles = cpu.step(&mut mmu).unwrap();
            assert_eq!(cycles, machine_cycles * 4, "Comparison with cycles failed for {}", name);

            for (register, key) in [
                (Register::A, "a"),
                (Register::F, "f"),
                (Register::B, "b"),
                (Register::C, "c"),
                (Register::D, "d"),
                (Register::E, "e"),
                (Register::H, "h"),
                (Register::L, "l"),
            ] {
                assert_eq!(
                    cpu.read_register(&register),
                    field(final_state, key) as u8,
                    "Comparison with register {} failed for {}",
                    register,
                    name
                );
            }
            assert_eq!(
                cpu.read_register16(&Register::SP),
                field(final_state, "sp") as u16,
                "Comparison with register SP failed for {}",
                name
            );
            assert_eq!(
                cpu.read_register16(&Register::PC),
                field(final_state, "pc") as u16,
                "Comparison with register PC failed for {}",
                name
            );
            assert_eq!(
                cpu.ime().enabled,
                field(final_state, "ime") == 1,
                "Comparison with IME failed for {}",
                name
            );

            let ram = final_state.get("ram").unwrap().as_array().unwrap();
            for value in ram {
                let addr = value.as_array().unwrap()[0].as_u64().unwrap() as u16;
                let value = value.as_array().unwrap()[1].as_u64().unwrap() as u8;

                assert_eq!(mmu.read(addr), value, "Comparison with RAM failed for {}", name);
            }
        }
    }
}
