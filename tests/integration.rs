#[cfg(test)]
mod integration_tests {
    use mockall::mock;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serial_test::serial;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use sprdmm::gsp::cmd::{gsp_get_capability_cmd, gsp_trigger_cmd};
    use sprdmm::gsp::{
        BaseCfg, Capability, DriverConfig, KcfgStatus, RuntimeStatus, SuspendState, BASE_CFG_SIZE,
        CAPABILITY_MAGIC, CAPABILITY_SIZE,
    };
    use sprdmm::{Driver, GspError, GspResult, UserBuffer, UserMemory};

    mock! {
        pub Mem {}
        impl UserMemory for Mem {
            fn len(&self) -> usize;
            fn copy_from_user(&self, offset: usize, dst: &mut [u8]) -> GspResult<()>;
            fn copy_to_user(&mut self, offset: usize, src: &[u8]) -> GspResult<()>;
        }
    }

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn config(latency_ms: u64) -> DriverConfig {
        DriverConfig {
            suspend_wait: Duration::from_millis(1000),
            resume_wait: Duration::from_millis(1000),
            kcfg_wait: Duration::from_millis(2000),
            autosuspend_delay: Duration::from_millis(20),
            job_latency: Duration::from_millis(latency_ms),
        }
    }

    fn payload(cnt: usize, layers: u32) -> UserBuffer {
        let bytes: Vec<u8> = (0..cnt)
            .flat_map(|i| {
                BaseCfg { layer_num: layers, init: false, size: BASE_CFG_SIZE as u32, tag: i as u32 }
                    .to_bytes()
            })
            .collect();
        UserBuffer::from_bytes(&bytes)
    }

    fn sync_trigger(cnt: u32) -> u32 {
        gsp_trigger_cmd(false, false, cnt, BASE_CFG_SIZE)
    }

    #[test]
    fn test_library_initialization() {
        sprdmm::init();
        assert!(!sprdmm::version().is_empty());
        assert_eq!(sprdmm::load_builtin_nodes().len(), 10);
    }

    #[test]
    #[serial]
    fn test_sync_trigger_blocks_until_done() {
        init_logger();
        let drv = Driver::probe_builtin("sprd,gsp-r6p0-sharkl3", config(30)).unwrap();
        let file = drv.open().unwrap();
        let core = Arc::clone(drv.device().core(0).unwrap());

        let start = Instant::now();
        let ret = file.ioctl(sync_trigger(1), &mut payload(1, 1)).unwrap();
        assert_eq!(ret, 0);
        assert!(start.elapsed() >= Duration::from_millis(30));

        let status = core.status();
        assert_eq!(status.jobs_done, 1);
        assert_eq!(status.pending, 0);
        assert!(status.idle);
        assert_eq!(core.pool().available(), core.pool().capacity());
        drv.remove().unwrap();
    }

    #[test]
    fn test_get_capability() {
        let drv = Driver::probe_builtin("sprd,gsp-r3p0-whale2", DriverConfig::quick()).unwrap();
        let file = drv.open().unwrap();
        let mut buf = UserBuffer::zeroed(64);
        file.ioctl(gsp_get_capability_cmd(64), &mut buf).unwrap();

        let capa = Capability::from_bytes(buf.as_bytes()).unwrap();
        assert_eq!(capa.magic, CAPABILITY_MAGIC);
        assert_eq!(capa.core_cnt, 2);
        assert_eq!(capa.io_cnt, 8);
        assert!(buf.as_bytes()[CAPABILITY_SIZE..].iter().all(|&b| b == 0));
        drv.remove().unwrap();
    }

    #[test]
    fn test_small_capability_buffer() {
        let drv = Driver::probe_builtin("sprd,gsp-r1p1-sc9830", DriverConfig::quick()).unwrap();
        let file = drv.open().unwrap();
        let mut mem = MockMem::new();
        mem.expect_copy_to_user().never();
        let err = file.ioctl(gsp_get_capability_cmd(CAPABILITY_SIZE - 1), &mut mem).unwrap_err();
        assert!(matches!(err, GspError::InvalidArgument(_)));
        assert_eq!(err.errno(), -libc::EINVAL);
        drv.remove().unwrap();
    }

    #[rstest]
    #[case(0)]
    #[case(9)]
    #[case(15)]
    fn test_count_out_of_range_allocates_nothing(#[case] cnt: u32) {
        let drv = Driver::probe_builtin("sprd,gsp-r6p0-sharkl3", DriverConfig::quick()).unwrap();
        let file = drv.open().unwrap();
        let mut mem = MockMem::new();
        mem.expect_copy_from_user().never();
        let err = file.ioctl(sync_trigger(cnt), &mut mem).unwrap_err();
        assert_eq!(err.errno(), -libc::EINVAL);
        let core = drv.device().core(0).unwrap();
        assert_eq!(core.pool().available(), core.pool().capacity());
        assert_eq!(core.load(), 0);
        drv.remove().unwrap();
    }

    #[test]
    fn test_foreign_ioctl_is_not_tty() {
        let drv = Driver::probe_builtin("sprd,gsp-r6p0-sharkl3", DriverConfig::quick()).unwrap();
        let file = drv.open().unwrap();
        let err = file.ioctl(0x8004_4D00, &mut UserBuffer::zeroed(4)).unwrap_err();
        assert_eq!(err.errno(), -libc::ENOTTY);
        drv.remove().unwrap();
    }

    #[test]
    fn test_split_spreads_over_cores() {
        let drv = Driver::probe_builtin("sprd,gsp-r4p0-iwhale2", DriverConfig::quick()).unwrap();
        let file = drv.open().unwrap();
        let cmd = gsp_trigger_cmd(false, true, 4, BASE_CFG_SIZE);
        file.ioctl(cmd, &mut payload(4, 2)).unwrap();
        for core in drv.device().cores() {
            assert_eq!(core.status().jobs_done, 2);
        }
        drv.remove().unwrap();
    }

    #[test]
    fn test_bad_layer_count_fails_the_list() {
        let drv = Driver::probe_builtin("sprd,gsp-lite_r1p0-sc9833", DriverConfig::quick()).unwrap();
        let file = drv.open().unwrap();
        // lite_r1p0 blends two layers
        let err = file.ioctl(sync_trigger(1), &mut payload(1, 3)).unwrap_err();
        assert!(matches!(err, GspError::Hardware(_)));
        let core = drv.device().core(0).unwrap();
        assert_eq!(core.status().jobs_done, 0);
        assert!(core.is_idle());
        drv.remove().unwrap();
    }

    #[test]
    #[serial]
    fn test_pool_exhaustion_is_busy() {
        init_logger();
        let mut node = sprdmm::builtin_node("sprd,gsp-r6p0-sharkl3").unwrap();
        node.cores[0].kcfg_num = Some(2);
        let drv = Driver::probe(&node, config(50)).unwrap();
        let file = drv.open().unwrap();

        let async_two = gsp_trigger_cmd(true, false, 2, BASE_CFG_SIZE);
        file.ioctl(async_two, &mut payload(2, 1)).unwrap();
        let err = file.ioctl(sync_trigger(1), &mut payload(1, 1)).unwrap_err();
        assert_eq!(err.errno(), -libc::EBUSY);
        drv.remove().unwrap();
    }

    #[test]
    #[serial]
    fn test_remove_cancels_queued_async_work() {
        let drv = Driver::probe_builtin("sprd,gsp-r6p0-sharkl3", config(50)).unwrap();
        let file = drv.open().unwrap();
        file.ioctl(gsp_trigger_cmd(true, false, 3, BASE_CFG_SIZE), &mut payload(3, 1)).unwrap();
        let core = Arc::clone(drv.device().core(0).unwrap());
        assert_eq!(core.load(), 3);
        drv.remove().unwrap();
        assert_eq!(core.load(), 0);
        assert_eq!(core.pool().available(), core.pool().capacity());
    }

    #[test]
    fn test_suspend_twice_is_noop() {
        let drv = Driver::probe_builtin("sprd,gsp-r3p0-whale2", DriverConfig::quick()).unwrap();
        drv.pm_suspend().unwrap();
        let dev = drv.device();
        assert!(dev.is_fully_suspended());
        for core in dev.cores() {
            assert_eq!(core.suspend_state(), SuspendState::Begin);
        }
        let start = Instant::now();
        drv.pm_suspend().unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));
        drv.pm_resume().unwrap();
        drv.remove().unwrap();
    }

    #[test]
    fn test_resume_wait_without_suspend() {
        let drv = Driver::probe_builtin("sprd,gsp-r6p0-sharkl3", DriverConfig::quick()).unwrap();
        let start = Instant::now();
        drv.device().resume_wait().unwrap();
        assert!(start.elapsed() < Duration::from_millis(50));
        drv.remove().unwrap();
    }

    #[test]
    #[serial]
    fn test_suspend_drains_running_job() {
        init_logger();
        let drv = Driver::probe_builtin("sprd,gsp-r6p0-sharkl3", config(60)).unwrap();
        let file = drv.open().unwrap();
        file.ioctl(gsp_trigger_cmd(true, false, 1, BASE_CFG_SIZE), &mut payload(1, 1)).unwrap();
        let core = Arc::clone(drv.device().core(0).unwrap());
        assert!(!core.is_idle());

        drv.pm_suspend().unwrap();
        assert_eq!(core.suspend_state(), SuspendState::Wait);
        assert!(core.is_suspend());
        assert!(core.is_idle());
        assert_eq!(core.status().jobs_done, 1);
        assert!(!drv.device().interface().is_prepared());

        drv.pm_resume().unwrap();
        assert_eq!(core.suspend_state(), SuspendState::Exit);
        drv.remove().unwrap();
    }

    #[test]
    #[serial]
    fn test_trigger_waits_for_system_resume() {
        init_logger();
        let drv = Driver::probe_builtin("sprd,gsp-r6p0-sharkl3", config(1)).unwrap();
        let file = drv.open().unwrap();
        drv.pm_suspend().unwrap();

        let dev = Arc::clone(drv.device());
        let resumer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(40));
            dev.pm_resume()
        });

        let start = Instant::now();
        file.ioctl(sync_trigger(1), &mut payload(1, 1)).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(30));
        resumer.join().unwrap().unwrap();

        let core = drv.device().core(0).unwrap();
        assert_eq!(core.status().jobs_done, 1);
        assert!(!core.is_suspend());
        drv.remove().unwrap();
    }

    #[test]
    #[serial]
    fn test_resume_wait_timeout_releases_list() {
        let mut cfg = config(1);
        cfg.resume_wait = Duration::from_millis(20);
        let drv = Driver::probe_builtin("sprd,gsp-r6p0-sharkl3", cfg).unwrap();
        let file = drv.open().unwrap();
        drv.pm_suspend().unwrap();

        let err = file.ioctl(sync_trigger(2), &mut payload(2, 1)).unwrap_err();
        assert!(matches!(err, GspError::Timeout(_)));
        let core = drv.device().core(0).unwrap();
        assert_eq!(core.load(), 0);
        assert_eq!(core.pool().available(), core.pool().capacity());

        drv.pm_resume().unwrap();
        file.ioctl(sync_trigger(1), &mut payload(1, 1)).unwrap();
        drv.remove().unwrap();
    }

    #[test]
    #[serial]
    fn test_autosuspend_and_resume_on_demand() {
        let drv = Driver::probe_builtin("sprd,gsp-r6p0-sharkl3", config(1)).unwrap();
        let file = drv.open().unwrap();
        let dev = Arc::clone(drv.device());
        file.ioctl(sync_trigger(1), &mut payload(1, 1)).unwrap();

        thread::sleep(Duration::from_millis(40));
        assert!(dev.autosuspend_if_expired().unwrap());
        assert!(dev.is_suspend());

        file.ioctl(sync_trigger(1), &mut payload(1, 1)).unwrap();
        assert!(!dev.is_suspend());
        assert_eq!(dev.core(0).unwrap().status().jobs_done, 2);
        drv.remove().unwrap();
    }

    #[test]
    #[serial]
    fn test_trigger_during_runtime_suspend() {
        init_logger();
        let drv = Driver::probe_builtin("sprd,gsp-r6p0-sharkl3", config(200)).unwrap();
        let file = drv.open().unwrap();
        file.ioctl(gsp_trigger_cmd(true, false, 1, BASE_CFG_SIZE), &mut payload(1, 1)).unwrap();

        let dev = Arc::clone(drv.device());
        let suspender = thread::spawn(move || dev.runtime_suspend());
        thread::sleep(Duration::from_millis(30));
        assert!(drv.device().is_suspending());

        file.ioctl(sync_trigger(1), &mut payload(1, 1)).unwrap();
        suspender.join().unwrap().unwrap();

        let dev = drv.device();
        assert_eq!(dev.core(0).unwrap().status().jobs_done, 2);
        assert_eq!(dev.runtime_status(), RuntimeStatus::Active);
        assert!(!dev.is_suspend());
        assert!(!dev.is_suspending());
        drv.remove().unwrap();
    }

    #[test]
    #[serial]
    fn test_aborted_runtime_suspend_keeps_device_usable() {
        init_logger();
        let mut cfg = config(100);
        cfg.suspend_wait = Duration::from_millis(20);
        let drv = Driver::probe_builtin("sprd,gsp-r6p0-sharkl3", cfg).unwrap();
        let file = drv.open().unwrap();
        file.ioctl(gsp_trigger_cmd(true, false, 1, BASE_CFG_SIZE), &mut payload(1, 1)).unwrap();

        let err = drv.runtime_suspend().unwrap_err();
        assert!(err.is_wait_failure());
        let core = Arc::clone(drv.device().core(0).unwrap());
        assert_eq!(core.suspend_state(), SuspendState::Exit);
        assert!(!core.is_suspend());
        assert_eq!(drv.device().runtime_status(), RuntimeStatus::Active);

        thread::sleep(Duration::from_millis(150));
        file.ioctl(sync_trigger(1), &mut payload(1, 1)).unwrap();
        assert_eq!(core.status().jobs_done, 2);
        drv.remove().unwrap();
    }

    #[test]
    #[serial]
    fn test_aborted_system_suspend_releases_waiting_trigger() {
        let mut cfg = config(150);
        cfg.suspend_wait = Duration::from_millis(40);
        let drv = Driver::probe_builtin("sprd,gsp-r6p0-sharkl3", cfg).unwrap();
        let file = drv.open().unwrap();
        file.ioctl(gsp_trigger_cmd(true, false, 1, BASE_CFG_SIZE), &mut payload(1, 1)).unwrap();

        let dev = Arc::clone(drv.device());
        let suspender = thread::spawn(move || dev.pm_suspend());
        thread::sleep(Duration::from_millis(10));

        file.ioctl(sync_trigger(1), &mut payload(1, 1)).unwrap();
        assert!(suspender.join().unwrap().is_err());
        assert_eq!(drv.device().core(0).unwrap().status().jobs_done, 2);
        assert!(!drv.device().is_suspending());
        drv.remove().unwrap();
    }

    #[test]
    fn test_kcfg_entries_finish_once() {
        let drv = Driver::probe_builtin("sprd,gsp-r6p0-sharkl3", DriverConfig::quick()).unwrap();
        let dev = drv.device();
        let mut list = sprdmm::gsp::KcfgList::new(false, false, BASE_CFG_SIZE, 3);
        list.acquire(dev).unwrap();
        list.fill(&payload(3, 1)).unwrap();
        list.push().unwrap();
        dev.start_work();
        list.wait(Duration::from_secs(2)).unwrap();

        assert_eq!(list.completion_fires(), 1);
        for kcfg in list.entries() {
            assert_eq!(kcfg.status(), KcfgStatus::Done);
            assert!(kcfg.is_started());
        }
        list.put();
        drv.remove().unwrap();
    }

    #[test]
    fn test_node_file_probe() {
        use std::io::Write;
        let node = sprdmm::builtin_node("sprd,gsp-lite_r3p0-sharkl5").unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(node.to_json().unwrap().as_bytes()).unwrap();

        let loaded = sprdmm::DeviceNode::load(file.path()).unwrap();
        assert_eq!(loaded, node);
        let drv = Driver::probe(&loaded, DriverConfig::quick()).unwrap();
        assert_eq!(drv.device().io_cnt(), 4);
        drv.remove().unwrap();
    }
}
