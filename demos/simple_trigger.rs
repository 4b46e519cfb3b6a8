//! Probe a GSP device, read its capability and run one synchronous trigger

use sprdmm::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("sprdmm GSP trigger example");
    println!("==========================\n");

    let driver = Driver::probe_builtin("sprd,gsp-r6p0-sharkl3", DriverConfig::quick())?;
    let file = driver.open()?;

    let mut buf = UserBuffer::zeroed(CAPABILITY_SIZE);
    file.ioctl(gsp_get_capability_cmd(CAPABILITY_SIZE), &mut buf)?;
    let capa = Capability::from_bytes(buf.as_bytes())?;
    println!("Cores: {}, kcfgs per trigger: {}", capa.core_cnt, capa.io_cnt);
    println!("Layers: {}, max output {}x{}", capa.max_layer, capa.max_width, capa.max_height);

    let cfg = BaseCfg { layer_num: 2, init: false, size: BASE_CFG_SIZE as u32, tag: 1 };
    let mut payload = UserBuffer::from_bytes(&cfg.to_bytes());
    match file.ioctl(gsp_trigger_cmd(false, false, 1, BASE_CFG_SIZE), &mut payload) {
        Ok(_) => println!("Trigger done"),
        Err(e) => println!("Trigger failed ({}): {}", e.errno(), e),
    }

    println!("{}", serde_json::to_string_pretty(&driver.device().status())?);
    driver.remove()?;
    Ok(())
}
