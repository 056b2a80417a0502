use axum::response::Html;

/// Main dashboard page
pub async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>NSE Screener</title>
    <script src="https://unpkg.com/lightweight-charts@4.1.0/dist/lightweight-charts.standalone.production.js"></script>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #131722;
            color: #d1d4dc;
            min-height: 100vh;
        }
        .header {
            padding: 12px 24px;
            background: #1e222d;
            border-bottom: 1px solid #2a2e39;
            display: flex;
            align-items: center;
            gap: 16px;
            flex-wrap: wrap;
        }
        .header h1 { font-size: 18px; color: #00c853; font-weight: 600; }
        .controls { display: flex; gap: 12px; align-items: center; flex-wrap: wrap; }
        select, button, input {
            background: #2a2e39;
            border: 1px solid #363c4e;
            color: #d1d4dc;
            padding: 8px 12px;
            border-radius: 4px;
            font-size: 14px;
        }
        input[type="number"] { width: 64px; }
        input.symbol { width: 140px; text-transform: uppercase; }
        button { background: #00c853; color: #131722; font-weight: 600; cursor: pointer; }
        button:hover { background: #00e676; }
        button.secondary { background: #2a2e39; color: #d1d4dc; }
        button.secondary:hover { border-color: #00c853; }
        .indicator-group {
            display: flex; align-items: center; gap: 6px;
            padding: 4px 8px; background: #252930; border-radius: 4px; font-size: 12px;
        }
        .indicator-group label { color: #787b86; }
        #chart-container { width: 100%; height: 460px; position: relative; }
        #rsi-container, #macd-container { width: 100%; height: 120px; border-top: 1px solid #2a2e39; }
        .pane-label { font-size: 11px; color: #787b86; padding: 2px 24px; background: #1e222d; }
        .panels { display: grid; grid-template-columns: 1fr 1fr; gap: 16px; padding: 16px 24px; }
        .panel { background: #1e222d; border-radius: 8px; padding: 12px 16px; overflow: auto; max-height: 420px; }
        .panel h2 { font-size: 14px; color: #787b86; margin-bottom: 8px; font-weight: 500; }
        .metrics { display: flex; gap: 24px; flex-wrap: wrap; font-size: 13px; margin-bottom: 8px; }
        .metrics .label { color: #787b86; }
        .metrics .value { font-weight: 600; }
        table { width: 100%; border-collapse: collapse; font-size: 12px; }
        th, td { padding: 4px 8px; text-align: right; border-bottom: 1px solid #2a2e39; }
        th:first-child, td:first-child { text-align: left; }
        th { color: #787b86; font-weight: 500; position: sticky; top: 0; background: #1e222d; }
        .up { color: #00c853; }
        .down { color: #ff5252; }
        .open { color: #ffb300; }
        .status { font-size: 12px; color: #787b86; }
        .error { color: #ff5252; }
        .legend { display: flex; gap: 16px; font-size: 12px; padding: 4px 24px; }
        .legend-item { display: flex; align-items: center; gap: 4px; }
        .legend-color { width: 12px; height: 3px; border-radius: 1px; }
    </style>
</head>
<body>
    <div class="header">
        <h1>NSE Screener</h1>
        <div class="controls">
            <input class="symbol" id="symbol" list="symbol-list" value="RELIANCE" placeholder="Symbol">
            <datalist id="symbol-list"></datalist>
            <select id="interval">
                <option value="5m">5m</option>
                <option value="15m">15m</option>
                <option value="60m">1h</option>
                <option value="1d" selected>1d</option>
                <option value="1wk">1w</option>
            </select>
            <select id="strategy"></select>
            <div class="indicator-group">
                <label for="years">Years</label>
                <input type="number" id="years" value="3" min="1" max="20">
            </div>
            <div class="indicator-group">
                <input type="checkbox" id="show-bb" checked>
                <label for="show-bb">Bollinger</label>
            </div>
            <button onclick="loadChart()">Load</button>
            <button onclick="runBacktest()">Backtest</button>
        </div>
        <span class="status" id="status"></span>
    </div>
    <div class="legend">
        <div class="legend-item"><div class="legend-color" style="background: #2196f3;"></div>SMA fast</div>
        <div class="legend-item"><div class="legend-color" style="background: #9c27b0;"></div>SMA slow</div>
        <div class="legend-item"><div class="legend-color" style="background: #ff9800;"></div>EMA</div>
        <div class="legend-item"><div class="legend-color" style="background: #607d8b;"></div>Bollinger</div>
    </div>
    <div id="chart-container"></div>
    <div class="pane-label">RSI</div>
    <div id="rsi-container"></div>
    <div class="pane-label">MACD</div>
    <div id="macd-container"></div>

    <div class="panels">
        <div class="panel">
            <h2>Backtest</h2>
            <div class="metrics" id="bt-metrics"></div>
            <table>
                <thead><tr><th>Date</th><th>Entry</th><th>SL</th><th>Target</th><th>Exit</th><th>Bars</th><th>Outcome</th></tr></thead>
                <tbody id="bt-trades"></tbody>
            </table>
        </div>
        <div class="panel">
            <h2>Screener</h2>
            <div class="controls" style="margin-bottom: 8px;">
                <input id="scan-symbols" placeholder="NIFTY,BANKNIFTY,SBIN (blank = universe)" style="flex: 1;">
                <select id="scan-interval">
                    <option value="5m" selected>5m</option>
                    <option value="15m">15m</option>
                </select>
                <button class="secondary" onclick="runScan()">Scan</button>
            </div>
            <table>
                <thead><tr><th>Symbol</th><th>Time</th><th>Pattern</th><th>Entry</th><th>SL</th><th>Target</th></tr></thead>
                <tbody id="scan-rows"></tbody>
            </table>
        </div>
        <div class="panel" style="grid-column: span 2;">
            <h2>Universe backtest</h2>
            <div class="controls" style="margin-bottom: 8px;">
                <div class="indicator-group">
                    <label for="universe-limit">Limit</label>
                    <input type="number" id="universe-limit" value="50" min="1" max="500">
                </div>
                <button class="secondary" onclick="runUniverse()">Run universe</button>
                <span class="status" id="universe-status"></span>
            </div>
            <div class="metrics" id="universe-metrics"></div>
            <table>
                <thead><tr><th>Symbol</th><th>Bars</th><th>Trades</th><th>Win rate</th><th>Total R</th></tr></thead>
                <tbody id="universe-rows"></tbody>
            </table>
        </div>
    </div>

    <script>
        const IST_OFFSET = 19800;
        const chartOptions = {
            layout: { background: { color: '#131722' }, textColor: '#d1d4dc' },
            grid: { vertLines: { color: '#1e222d' }, horzLines: { color: '#1e222d' } },
            timeScale: { timeVisible: true, secondsVisible: false, borderColor: '#2a2e39' },
            rightPriceScale: { borderColor: '#2a2e39' },
        };

        const el = (id) => document.getElementById(id);
        const toTime = (t) => Math.floor(Date.parse(t) / 1000) + IST_OFFSET;
        const fmt = (v, d = 2) => (v === null || v === undefined) ? '-' : Number(v).toFixed(d);
        const outcomeClass = (o) => o === 'HIT_TARGET' ? 'up' : (o === 'HIT_SL' ? 'down' : 'open');

        const chart = LightweightCharts.createChart(el('chart-container'), chartOptions);
        const candles = chart.addCandlestickSeries({
            upColor: '#00c853', downColor: '#ff5252', borderVisible: false,
            wickUpColor: '#00c853', wickDownColor: '#ff5252',
        });
        const volume = chart.addHistogramSeries({ priceFormat: { type: 'volume' }, priceScaleId: '' });
        volume.priceScale().applyOptions({ scaleMargins: { top: 0.8, bottom: 0 } });
        const line = (color, width = 1) => chart.addLineSeries({ color, lineWidth: width, priceLineVisible: false, lastValueVisible: false });
        const smaFast = line('#2196f3', 2);
        const smaSlow = line('#9c27b0', 2);
        const ema = line('#ff9800', 2);
        const bbUpper = line('#607d8b');
        const bbMiddle = line('#455a64');
        const bbLower = line('#607d8b');

        const rsiChart = LightweightCharts.createChart(el('rsi-container'), chartOptions);
        const rsi = rsiChart.addLineSeries({ color: '#e91e63', lineWidth: 1 });
        rsi.createPriceLine({ price: 70, color: '#787b86', lineStyle: 2 });
        rsi.createPriceLine({ price: 30, color: '#787b86', lineStyle: 2 });

        const macdChart = LightweightCharts.createChart(el('macd-container'), chartOptions);
        const macdHist = macdChart.addHistogramSeries({});
        const macdLine = macdChart.addLineSeries({ color: '#2196f3', lineWidth: 1 });
        const macdSignal = macdChart.addLineSeries({ color: '#ff9800', lineWidth: 1 });

        // Keep the indicator panes scrolled with the price chart
        chart.timeScale().subscribeVisibleLogicalRangeChange((range) => {
            if (range) {
                rsiChart.timeScale().setVisibleLogicalRange(range);
                macdChart.timeScale().setVisibleLogicalRange(range);
            }
        });

        async function getJson(url) {
            const response = await fetch(url);
            const body = await response.json();
            if (!response.ok) throw new Error(body.error || response.statusText);
            return body;
        }

        function setStatus(text, isError = false) {
            el('status').textContent = text;
            el('status').className = isError ? 'status error' : 'status';
        }

        function column(rows, key) {
            return rows.filter(r => r[key] !== null).map(r => ({ time: toTime(r.time), value: Number(r[key]) }));
        }

        async function loadChart() {
            const symbol = el('symbol').value.trim().toUpperCase();
            const interval = el('interval').value;
            if (!symbol) return;
            const history = interval === '1d' || interval === '1wk' ? `years=${el('years').value}` : 'range=5d';
            setStatus(`Loading ${symbol}...`);
            try {
                const data = await getJson(`/api/indicators?symbol=${encodeURIComponent(symbol)}&interval=${interval}&${history}`);
                const rows = data.rows;
                candles.setData(rows.map(r => ({ time: toTime(r.time), open: r.open, high: r.high, low: r.low, close: r.close })));
                volume.setData(rows.map(r => ({
                    time: toTime(r.time), value: Number(r.volume),
                    color: r.close >= r.open ? 'rgba(0, 200, 83, 0.4)' : 'rgba(255, 82, 82, 0.4)',
                })));
                smaFast.setData(column(rows, 'sma_fast'));
                smaSlow.setData(column(rows, 'sma_slow'));
                ema.setData(column(rows, 'ema'));
                const showBb = el('show-bb').checked;
                bbUpper.setData(showBb ? column(rows, 'bb_upper') : []);
                bbMiddle.setData(showBb ? column(rows, 'bb_middle') : []);
                bbLower.setData(showBb ? column(rows, 'bb_lower') : []);
                rsi.setData(column(rows, 'rsi'));
                macdLine.setData(column(rows, 'macd'));
                macdSignal.setData(column(rows, 'macd_signal'));
                macdHist.setData(column(rows, 'macd_hist').map(p => ({ ...p, color: p.value >= 0 ? '#26a69a' : '#ef5350' })));
                candles.setMarkers([]);
                chart.timeScale().fitContent();
                setStatus(`${data.symbol}: ${rows.length} bars`);
            } catch (e) {
                setStatus(e.message, true);
            }
        }

        function renderMetrics(target, m) {
            el(target).innerHTML = `
                <div><span class="label">Trades</span> <span class="value">${m.total_trades}</span></div>
                <div><span class="label">Target hit</span> <span class="value up">${m.successful}</span></div>
                <div><span class="label">Stopped</span> <span class="value down">${m.failed}</span></div>
                <div><span class="label">Open</span> <span class="value open">${m.open}</span></div>
                <div><span class="label">Win rate</span> <span class="value">${fmt(m.win_rate, 1)}%</span></div>
                <div><span class="label">Total R</span> <span class="value">${fmt(m.total_r)}</span></div>
                <div><span class="label">Expectancy</span> <span class="value">${fmt(m.expectancy_r)} R</span></div>
                <div><span class="label">Avg bars</span> <span class="value">${fmt(m.avg_bars_held, 1)}</span></div>`;
        }

        async function runBacktest() {
            const symbol = el('symbol').value.trim().toUpperCase();
            const strategy = el('strategy').value;
            const years = el('years').value;
            el('interval').value = '1d';
            await loadChart();
            setStatus(`Backtesting ${symbol} (${strategy})...`);
            try {
                const result = await getJson(`/api/backtest?symbol=${encodeURIComponent(symbol)}&strategy=${strategy}&years=${years}`);
                renderMetrics('bt-metrics', result.metrics);
                el('bt-trades').innerHTML = result.trades.map(t => `
                    <tr>
                        <td>${t.date.slice(0, 10)}</td><td>${fmt(t.entry)}</td><td>${fmt(t.stop)}</td>
                        <td>${fmt(t.target)}</td><td>${fmt(t.exit_price)}</td><td>${t.bars_held ?? '-'}</td>
                        <td class="${outcomeClass(t.outcome)}">${t.outcome}</td>
                    </tr>`).join('');

                const markers = [];
                for (const t of result.trades) {
                    markers.push({ time: toTime(t.date), position: 'belowBar', color: '#2196f3', shape: 'arrowUp', text: fmt(t.entry) });
                    if (t.exit_date) {
                        const hit = t.outcome === 'HIT_TARGET';
                        markers.push({
                            time: toTime(t.exit_date), position: hit ? 'aboveBar' : 'belowBar',
                            color: hit ? '#00c853' : '#ff5252', shape: hit ? 'circle' : 'square', text: hit ? 'T' : 'SL',
                        });
                    }
                }
                markers.sort((a, b) => a.time - b.time);
                candles.setMarkers(markers);
                setStatus(`${symbol}: ${result.trades.length} trades over ${result.bars} bars`);
            } catch (e) {
                setStatus(e.message, true);
            }
        }

        async function runUniverse() {
            const strategy = el('strategy').value;
            const limit = el('universe-limit').value;
            el('universe-status').textContent = 'Running... this may take several minutes.';
            try {
                const report = await getJson(`/api/backtest/universe?strategy=${strategy}&limit=${limit}`);
                renderMetrics('universe-metrics', report.metrics);
                const rows = report.summaries.map(s => `
                    <tr><td>${s.symbol}</td><td>${s.bars}</td><td>${s.trades}</td>
                    <td>${fmt(s.win_rate, 1)}%</td><td>${fmt(s.total_r)}</td></tr>`);
                const errors = report.errors.map(e => `
                    <tr><td>${e.symbol}</td><td class="error" colspan="4">${e.error}</td></tr>`);
                el('universe-rows').innerHTML = rows.concat(errors).join('');
                el('universe-status').textContent = `${report.symbols} symbols, ${report.errors.length} errors`;
            } catch (e) {
                el('universe-status').textContent = e.message;
            }
        }

        async function runScan() {
            const symbols = el('scan-symbols').value.trim();
            const interval = el('scan-interval').value;
            const query = symbols ? `symbols=${encodeURIComponent(symbols)}&` : '';
            el('scan-rows').innerHTML = '<tr><td colspan="6">Scanning...</td></tr>';
            try {
                const report = await getJson(`/api/scan?${query}interval=${interval}`);
                el('scan-rows').innerHTML = report.signals.length ? report.signals.map(s => `
                    <tr><td>${s.symbol}</td><td>${new Date(s.time).toLocaleTimeString('en-IN', { timeZone: 'Asia/Kolkata' })}</td>
                    <td>${s.pattern ?? '-'}</td><td>${fmt(s.entry)}</td><td>${fmt(s.stop)}</td><td>${fmt(s.target)}</td></tr>`).join('')
                    : `<tr><td colspan="6">No signals (${report.skipped.length} skipped)</td></tr>`;
            } catch (e) {
                el('scan-rows').innerHTML = `<tr><td class="error" colspan="6">${e.message}</td></tr>`;
            }
        }

        async function init() {
            try {
                const strategies = await getJson('/api/strategies');
                el('strategy').innerHTML = strategies.map(s => `<option value="${s.name}" title="${s.description}">${s.name}</option>`).join('');
            } catch (e) {
                setStatus(e.message, true);
            }
            getJson('/api/symbols')
                .then(symbols => { el('symbol-list').innerHTML = symbols.map(s => `<option value="${s}">`).join(''); })
                .catch(e => console.warn('Universe list unavailable:', e.message));
            loadChart();
        }

        window.onload = init;
    </script>
</body>
</html>"##;
