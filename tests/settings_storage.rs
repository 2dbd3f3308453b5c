//! 设置存储集成测试
//!
//! 测试共享设置存储与多个控制器之间的同步行为

use std::cell::RefCell;
use std::rc::Rc;

use readlens::reading::{constants, ReadingConfig, ReadingController, SettingsStore};

mod common {
    include!("common/mod.rs");
}

use common::{DomInspector, HtmlTestHelper};

/// 测试共享存储驱动两个页面同步
#[test]
fn test_store_synchronizes_two_pages() {
    let store = SettingsStore::new();
    let page = HtmlTestHelper::create_simple_english_page();

    let doc_a = HtmlTestHelper::create_observed_document(&page);
    let doc_b = HtmlTestHelper::create_observed_document(&page);
    let mut controller_a =
        ReadingController::with_store(doc_a, store.clone(), ReadingConfig::default());
    let mut controller_b =
        ReadingController::with_store(doc_b, store.clone(), ReadingConfig::default());

    controller_a.activate().unwrap();
    controller_b.activate().unwrap();

    // 页面A开启仿生，页面B在下一次pump时跟进
    controller_a.enable_bionic().unwrap();
    assert!(!controller_b.is_bionic_enabled());
    controller_b.pump().unwrap();
    assert!(controller_b.is_bionic_enabled());

    let root_b = controller_b.document().document();
    assert!(DomInspector::count_marks(&root_b, constants::BIONIC_MARK_CLASS) > 0);

    // 页面A自己的pump发现期望值与现状一致，不会重复处理
    assert_eq!(controller_a.pump().unwrap(), 0);

    // 页面B关闭仿生，页面A同样跟进撤销
    controller_b.disable_bionic().unwrap();
    controller_a.pump().unwrap();
    assert!(!controller_a.is_bionic_enabled());

    let root_a = controller_a.document().document();
    assert_eq!(DomInspector::count_marks(&root_a, constants::BIONIC_MARK_CLASS), 0);

    println!("✅ Store synchronization test passed - both pages converge on shared settings");
}

/// 测试设置在控制器重建后仍然生效
#[test]
fn test_settings_survive_controller_recreation() {
    let store = SettingsStore::new();
    let page = HtmlTestHelper::create_simple_english_page();

    {
        let doc = HtmlTestHelper::create_observed_document(&page);
        let mut controller =
            ReadingController::with_store(doc, store.clone(), ReadingConfig::default());
        controller.activate().unwrap();
        controller.enable_bionic().unwrap();
        controller.highlight_selection("typography").unwrap();
    }

    // 模拟页面重新加载：新文档、新控制器、同一份存储
    let doc = HtmlTestHelper::create_observed_document(&page);
    let mut controller =
        ReadingController::with_store(doc, store.clone(), ReadingConfig::default());
    controller.activate().unwrap();

    assert!(controller.is_bionic_enabled());
    assert_eq!(controller.highlight_target(), Some("typography"));

    let root = controller.document().document();
    assert!(DomInspector::count_marks(&root, constants::BIONIC_MARK_CLASS) > 0);
    assert!(DomInspector::count_marks(&root, constants::HIGHLIGHT_MARK_CLASS) > 0);

    println!("✅ Settings persistence test passed - a fresh controller restores the stored state");
}

/// 测试监听回调收到的新旧值
#[test]
fn test_watch_reports_new_and_old_values() {
    let store = SettingsStore::new();
    let events: Rc<RefCell<Vec<(Option<String>, Option<String>)>>> =
        Rc::new(RefCell::new(Vec::new()));

    let log = events.clone();
    store.watch("mode", move |new, old| {
        log.borrow_mut()
            .push((new.map(str::to_string), old.map(str::to_string)));
    });

    store.set("mode", "focus");
    store.set("mode", "focus"); // 值未变化，不通知
    store.set("mode", "skim");
    store.remove("mode");
    store.remove("mode"); // 键已不存在，不通知

    let events = events.borrow();
    assert_eq!(events.len(), 3, "only real changes are delivered");
    assert_eq!(events[0], (Some("focus".to_string()), None));
    assert_eq!(
        events[1],
        (Some("skim".to_string()), Some("focus".to_string()))
    );
    assert_eq!(events[2], (None, Some("skim".to_string())));

    println!("✅ Watch callback test passed - {} change events delivered", events.len());
}

/// 测试读写统计
#[test]
fn test_statistics_count_reads_and_writes() {
    let store = SettingsStore::new();

    assert_eq!(store.get("missing"), None);
    store.set("present", "1");
    assert_eq!(store.get("present"), Some("1".to_string()));

    let stats = store.stats();
    assert_eq!(stats.reads, 2);
    assert_eq!(stats.writes, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);

    store.reset_stats();
    assert_eq!(store.stats().reads, 0);

    println!("✅ Storage statistics test passed - hit rate {:.2}", stats.hit_rate());
}

/// 测试控制器的写入对外部监听可见
#[test]
fn test_controller_writes_are_observable() {
    let store = SettingsStore::new();
    let seen: Rc<RefCell<Vec<Option<String>>>> = Rc::new(RefCell::new(Vec::new()));

    let log = seen.clone();
    store.watch(constants::KEY_BIONIC_ENABLED, move |new, _| {
        log.borrow_mut().push(new.map(str::to_string));
    });

    let doc = HtmlTestHelper::create_observed_document(&HtmlTestHelper::create_simple_english_page());
    let mut controller =
        ReadingController::with_store(doc, store.clone(), ReadingConfig::default());
    controller.activate().unwrap();
    controller.enable_bionic().unwrap();
    controller.disable_bionic().unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![Some("true".to_string()), Some("false".to_string())],
        "every toggle reaches external watchers"
    );
    assert_eq!(store.watcher_count(constants::KEY_BIONIC_ENABLED), 2, "external plus controller watcher");

    println!("✅ Observable writes test passed - controller toggles broadcast through the store");
}
