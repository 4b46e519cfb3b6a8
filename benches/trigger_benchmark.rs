use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sprdmm::gsp::cmd::{gsp_get_capability_cmd, gsp_trigger_cmd};
use sprdmm::gsp::{BaseCfg, DriverConfig, BASE_CFG_SIZE, CAPABILITY_SIZE};
use sprdmm::{Driver, UserBuffer};

fn payload(cnt: u32) -> UserBuffer {
    let bytes: Vec<u8> = (0..cnt)
        .flat_map(|tag| {
            BaseCfg { layer_num: 1, init: false, size: BASE_CFG_SIZE as u32, tag }.to_bytes()
        })
        .collect();
    UserBuffer::from_bytes(&bytes)
}

pub fn bench_get_capability(c: &mut Criterion) {
    let driver = Driver::probe_builtin("sprd,gsp-r6p0-sharkl3", DriverConfig::quick()).unwrap();
    let file = driver.open().unwrap();
    let mut buf = UserBuffer::zeroed(CAPABILITY_SIZE);
    c.bench_function("get_capability", |b| {
        b.iter(|| file.ioctl(black_box(gsp_get_capability_cmd(CAPABILITY_SIZE)), &mut buf))
    });
    driver.remove().unwrap();
}

pub fn bench_sync_trigger(c: &mut Criterion) {
    let driver = Driver::probe_builtin("sprd,gsp-r3p0-whale2", DriverConfig::quick()).unwrap();
    let file = driver.open().unwrap();
    let mut single = payload(1);
    let mut split = payload(8);

    c.bench_function("sync_trigger_1", |b| {
        b.iter(|| file.ioctl(gsp_trigger_cmd(false, false, 1, BASE_CFG_SIZE), &mut single))
    });
    c.bench_function("sync_trigger_split_8", |b| {
        b.iter(|| file.ioctl(gsp_trigger_cmd(false, true, 8, BASE_CFG_SIZE), &mut split))
    });
    driver.remove().unwrap();
}

criterion_group!(benches, bench_get_capability, bench_sync_trigger);
criterion_main!(benches);
