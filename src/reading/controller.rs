//! 阅读控制器模块
//!
//! 把文档、设置存储、变更观察器和各转换器装配成一个可启停的整体：
//! - 激活时同步持久化设置并开始监听 DOM 变更
//! - 仿生模式与选区高亮的开关统一经由控制器，状态不落在全局
//! - `pump` 增量处理新增节点，自身的改动通过抑制守卫避免自触发

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, info};

use super::bionic::{BionicConfig, BionicStats, BionicTransformer};
use super::config::{constants, ReadingConfig};
use super::error::{helpers, ReadingResult};
use super::highlight::{normalize_target, HighlightConfig, HighlightStats, Highlighter, TargetAction};
use super::observer::{MutationObserver, ObservedDocument, SuppressGuard};
use super::stats::{PageStatistics, StatsCollector};
use super::storage::SettingsStore;

#[cfg(feature = "assistant")]
use super::assistant::{select_highlight_targets, Importance, PageAnalysis};

// ====== 控制器状态 ======

/// 控制器当前状态
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    pub active: bool,
    pub bionic_applied: bool,
    pub highlight_target: Option<String>,
}

// ====== 控制器 ======

/// 阅读增强控制器
pub struct ReadingController {
    document: ObservedDocument,
    store: SettingsStore,
    config: ReadingConfig,
    observer: MutationObserver,
    state: ControllerState,
    bionic: BionicTransformer,
    highlighter: Highlighter,
    settings_dirty: Rc<Cell<bool>>,
}

impl ReadingController {
    /// 用空设置存储创建控制器
    pub fn new(document: ObservedDocument, config: ReadingConfig) -> Self {
        Self::with_store(document, SettingsStore::new(), config)
    }

    /// 用已有设置存储创建控制器
    ///
    /// 注册对阅读相关键的监听，外部写入只置脏标记，
    /// 实际同步推迟到下一次 `pump`。
    pub fn with_store(
        document: ObservedDocument,
        store: SettingsStore,
        config: ReadingConfig,
    ) -> Self {
        let settings_dirty = Rc::new(Cell::new(false));

        let flag = settings_dirty.clone();
        store.watch(constants::KEY_BIONIC_ENABLED, move |_, _| flag.set(true));
        let flag = settings_dirty.clone();
        store.watch(constants::KEY_HIGHLIGHT_TARGET, move |_, _| flag.set(true));

        let observer = document.create_observer();
        let bionic = BionicTransformer::new(BionicConfig::from_config(&config));
        let highlighter = Highlighter::new(HighlightConfig::from_config(&config));

        Self {
            document,
            store,
            config,
            observer,
            state: ControllerState::default(),
            bionic,
            highlighter,
            settings_dirty,
        }
    }

    // ====== 生命周期 ======

    /// 激活控制器
    ///
    /// 连接观察器并按存储中的设置恢复页面状态。重复激活是空操作。
    pub fn activate(&mut self) -> ReadingResult<()> {
        if self.state.active {
            return Ok(());
        }

        self.observer.connect();
        self.state.active = true;
        info!("阅读控制器已激活");
        self.sync_with_store()
    }

    /// 停用控制器
    ///
    /// 撤销页面上的全部改动并断开观察器。存储里的设置保留，
    /// 下次激活时按原样恢复。
    pub fn deactivate(&mut self) -> ReadingResult<()> {
        if !self.state.active {
            return Ok(());
        }

        self.observer.disconnect();

        let scope = self.document.document();
        if self.state.bionic_applied {
            self.bionic.revert(&self.document, &scope)?;
        }
        self.highlighter.clear(&self.document, &scope)?;

        // 停用前积压的变更记录不再处理
        self.observer.take_records();
        self.state = ControllerState::default();
        info!("阅读控制器已停用");
        Ok(())
    }

    // ====== 仿生模式 ======

    /// 开启仿生阅读，返回转换的文本节点数
    pub fn enable_bionic(&mut self) -> ReadingResult<usize> {
        self.ensure_active()?;
        if self.state.bionic_applied {
            return Ok(0);
        }

        let transformed = self.apply_bionic_internal()?;
        self.store.set(constants::KEY_BIONIC_ENABLED, "true");
        Ok(transformed)
    }

    /// 关闭仿生阅读，返回展开的标记数
    pub fn disable_bionic(&mut self) -> ReadingResult<usize> {
        self.ensure_active()?;
        if !self.state.bionic_applied {
            return Ok(0);
        }

        let reverted = self.revert_bionic_internal()?;
        self.store.set(constants::KEY_BIONIC_ENABLED, "false");
        Ok(reverted)
    }

    // ====== 选区高亮 ======

    /// 处理一次选区变化
    ///
    /// 空选区清除高亮，单个字母或汉字忽略，其余作为目标词应用。
    /// 返回实际包裹的片段数。
    pub fn highlight_selection(&mut self, raw: &str) -> ReadingResult<usize> {
        self.ensure_active()?;

        match normalize_target(raw) {
            TargetAction::Ignore => {
                debug!("忽略单字符选区: {:?}", raw.trim());
                Ok(0)
            }
            TargetAction::Clear => {
                self.clear_highlight()?;
                Ok(0)
            }
            TargetAction::Apply(target) => {
                if self.state.highlight_target.as_deref() == Some(target.as_str()) {
                    return Ok(0);
                }
                let wrapped = self.apply_highlight_internal(&target)?;
                self.store.set(constants::KEY_HIGHLIGHT_TARGET, &target);
                Ok(wrapped)
            }
        }
    }

    /// 清除高亮并移除持久化的目标词
    pub fn clear_highlight(&mut self) -> ReadingResult<usize> {
        self.ensure_active()?;
        let cleared = self.clear_highlight_internal()?;
        self.store.remove(constants::KEY_HIGHLIGHT_TARGET);
        Ok(cleared)
    }

    // ====== 增量处理 ======

    /// 处理积压的设置变更与 DOM 变更记录
    ///
    /// 返回本轮处理的新增节点数。控制器未激活时直接返回 0。
    pub fn pump(&mut self) -> ReadingResult<usize> {
        if !self.state.active {
            return Ok(0);
        }

        if self.settings_dirty.replace(false) {
            self.sync_with_store()?;
        }

        let records = self.observer.take_records();
        if records.is_empty() {
            return Ok(0);
        }

        let mut processed = 0;
        let target = self.state.highlight_target.clone();
        let guard = SuppressGuard::new(&self.observer);
        for record in &records {
            for added in &record.added {
                if self.state.bionic_applied {
                    self.bionic.apply(&self.document, added)?;
                }
                if let Some(ref target) = target {
                    self.highlighter.highlight(&self.document, added, target)?;
                }
                processed += 1;
            }
        }
        drop(guard);

        debug!(
            "增量处理完成: {} 条记录, {} 个新增节点",
            records.len(),
            processed
        );
        Ok(processed)
    }

    // ====== 助手集成 ======

    /// 应用分析结果中的建议高亮
    ///
    /// 只应用达到配置重要程度的条目。建议高亮不改变当前目标词，
    /// 但清除高亮时会和普通高亮一起移除。
    #[cfg(feature = "assistant")]
    pub fn apply_analysis(&mut self, analysis: &PageAnalysis) -> ReadingResult<usize> {
        self.ensure_active()?;

        let min_importance = Importance::from_label(&self.config.assistant_min_importance)
            .unwrap_or_default();
        let targets = select_highlight_targets(analysis, min_importance);
        if targets.is_empty() {
            return Ok(0);
        }

        let guard = SuppressGuard::new(&self.observer);
        let scope = self.document.document();
        let mut wrapped = 0;
        for target in targets {
            wrapped += self.highlighter.highlight(&self.document, &scope, target)?;
        }
        drop(guard);

        info!("已应用建议高亮: {} 个片段", wrapped);
        Ok(wrapped)
    }

    // ====== 查询 ======

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn is_bionic_enabled(&self) -> bool {
        self.state.bionic_applied
    }

    pub fn highlight_target(&self) -> Option<&str> {
        self.state.highlight_target.as_deref()
    }

    pub fn document(&self) -> &ObservedDocument {
        &self.document
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    pub fn config(&self) -> &ReadingConfig {
        &self.config
    }

    /// 统计整页可读文本
    pub fn page_statistics(&self) -> PageStatistics {
        let scope = self.document.document();
        StatsCollector::from_config(&self.config).collect(&scope)
    }

    pub fn bionic_stats(&self) -> &BionicStats {
        self.bionic.stats()
    }

    pub fn highlight_stats(&self) -> &HighlightStats {
        self.highlighter.stats()
    }

    // ====== 内部操作 ======
    //
    // 内部方法只改 DOM 和控制器状态，不写存储；
    // 公开方法在内部操作成功后才持久化，避免和监听回调形成循环。

    fn ensure_active(&self) -> ReadingResult<()> {
        if self.state.active {
            Ok(())
        } else {
            Err(helpers::validation_error("控制器尚未激活"))
        }
    }

    fn apply_bionic_internal(&mut self) -> ReadingResult<usize> {
        let guard = SuppressGuard::new(&self.observer);
        let scope = self.document.document();
        let transformed = self.bionic.apply(&self.document, &scope)?;
        drop(guard);

        self.state.bionic_applied = true;
        debug!("仿生阅读已应用: {} 个文本节点", transformed);
        Ok(transformed)
    }

    fn revert_bionic_internal(&mut self) -> ReadingResult<usize> {
        let guard = SuppressGuard::new(&self.observer);
        let scope = self.document.document();
        let reverted = self.bionic.revert(&self.document, &scope)?;
        drop(guard);

        self.state.bionic_applied = false;
        debug!("仿生阅读已撤销: {} 个标记", reverted);
        Ok(reverted)
    }

    fn apply_highlight_internal(&mut self, target: &str) -> ReadingResult<usize> {
        let guard = SuppressGuard::new(&self.observer);
        let scope = self.document.document();
        if self.state.highlight_target.is_some() {
            self.highlighter.clear(&self.document, &scope)?;
        }
        let wrapped = self.highlighter.highlight(&self.document, &scope, target)?;
        drop(guard);

        self.state.highlight_target = Some(target.to_string());
        Ok(wrapped)
    }

    fn clear_highlight_internal(&mut self) -> ReadingResult<usize> {
        let guard = SuppressGuard::new(&self.observer);
        let scope = self.document.document();
        let cleared = self.highlighter.clear(&self.document, &scope)?;
        drop(guard);

        self.state.highlight_target = None;
        Ok(cleared)
    }

    /// 把存储中的期望状态同步到页面
    ///
    /// 逐项对比期望值与当前值，只执行有差异的切换。
    fn sync_with_store(&mut self) -> ReadingResult<()> {
        let desired_bionic = self
            .store
            .get(constants::KEY_BIONIC_ENABLED)
            .map(|value| matches!(value.as_str(), "true" | "1"))
            .unwrap_or(false);
        if desired_bionic != self.state.bionic_applied {
            if desired_bionic {
                self.apply_bionic_internal()?;
            } else {
                self.revert_bionic_internal()?;
            }
        }

        let desired_target = self
            .store
            .get(constants::KEY_HIGHLIGHT_TARGET)
            .filter(|target| !target.trim().is_empty());
        if desired_target != self.state.highlight_target {
            match desired_target {
                Some(target) => {
                    self.apply_highlight_internal(&target)?;
                }
                None => {
                    self.clear_highlight_internal()?;
                }
            }
        }

        Ok(())
    }
}
