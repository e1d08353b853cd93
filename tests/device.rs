use dmgcore::joypad::NoInput;
use dmgcore::lr35902::sm83::Register;
use dmgcore::memory::DIV_REGISTER;
use dmgcore::renderer::HeadlessRenderer;
use dmgcore::{DebugConfig, Device, Exit, StepOutcome};

fn rom_only() -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0147] = 0x00;
    rom
}

fn boot(cartridge: Vec<u8>) -> Device {
    Device::new(
        None,
        cartridge,
        Box::new(HeadlessRenderer::new()),
        Box::new(NoInput),
        DebugConfig::new(),
    )
    .unwrap()
}

#[test]
fn rom_only_nop_and_divider() {
    let mut device = boot(rom_only());
    assert_eq!(device.mmu().cartridge().name(), "ROM");
    assert_eq!(device.cpu().read_register16(&Register::PC), 0x0100);

    assert_eq!(device.step().unwrap(), StepOutcome::Executed(4));
    assert_eq!(device.cpu().read_register16(&Register::PC), 0x0101);

    device.mmu_mut().write(DIV_REGISTER, 0x00);
    assert_eq!(device.mmu().read(DIV_REGISTER), 0x00);

    assert_eq!(device.run_for(256).unwrap(), Exit::CyclesElapsed);
    assert_eq!(device.mmu().read(DIV_REGISTER), 0x01);
}

#[test]
fn mbc1_switches_banks_from_code() {
    // ld a, $03; ld ($2000), a; ld a, ($4000)
    let mut rom: Vec<u8> = (0..4u8).flat_map(|bank| vec![bank; 0x4000]).collect();
    rom[0x0147] = 0x01;
    rom[0x0148] = 0x01;
    rom[0x0100..0x0108].copy_from_slice(&[0x3e, 0x03, 0xea, 0x00, 0x20, 0xfa, 0x00, 0x40]);

    let mut device = boot(rom);
    for _ in 0..3 {
        device.step().unwrap();
    }

    assert_eq!(device.mmu().current_rom_bank(), 3);
    assert_eq!(device.cpu().read_register(&Register::A), 0x03);
}

#[test]
fn device_runs_on_another_thread() {
    let mut device = boot(rom_only());
    let control = device.control();

    let runner = std::thread::spawn(move || {
        let exit = device.start();
        (exit.map_err(|e| e.to_string()), device.cycles())
    });

    std::thread::sleep(std::time::Duration::from_millis(20));
    control.request_exit();

    let (exit, cycles) = runner.join().unwrap();
    assert_eq!(exit, Ok(Exit::Requested));
    assert!(cycles > 0);
}
